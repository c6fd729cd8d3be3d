use std::path::PathBuf;

pub fn run(jar: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let id = sourcescope_core::identify(&jar)?;

    println!("File:  {}", id.binary.display());
    println!("SHA-1: {}", id.sha1);
    match (id.gav(), id.embedded.len()) {
        (Some(gav), _) => println!("GAV:   {}", gav),
        (None, 0) => println!("GAV:   (no embedded pom.properties)"),
        (None, n) => {
            println!("GAV:   (shaded, {} embedded coordinates)", n);
            for gav in &id.embedded {
                println!("       {}", gav);
            }
        }
    }
    Ok(())
}
