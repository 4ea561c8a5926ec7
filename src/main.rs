use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use clap::Parser;
use lepton::{Geometry, ImageStore, Shell, DEFAULT_EXTENSION};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Directory holding the disk images
    #[arg(short = 'd', long, default_value = ".")]
    image_dir: PathBuf,

    /// File extension of disk images
    #[arg(short, long, default_value = DEFAULT_EXTENSION)]
    extension: String,

    /// Read commands from a file instead of stdin
    #[arg(short, long)]
    script: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let store = ImageStore::new(cli.image_dir, cli.extension);
    let mut shell = Shell::new(store, Geometry::default(), io::stdout().lock());

    match cli.script {
        Some(path) => {
            let file = File::open(&path)
                .map_err(|e| anyhow::anyhow!("cannot open script {}: {}", path.display(), e))?;
            shell.start(BufReader::new(file))?;
        }
        None => shell.start(io::stdin().lock())?,
    }

    Ok(())
}
