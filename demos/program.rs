use std::env;
use std::fs;

use avkit::compression::lz;
use avkit::{Archive, BinaryFile, Game, Result};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>()[..] {
        ["unlz", input, output] => fs::write(output, lz::unpack_bytes(&fs::read(input)?)?)?,
        ["lz", game, input, output] => {
            let game: Game = game.parse()?;
            fs::write(output, lz::pack_bytes(&fs::read(input)?, game)?)?;
        }
        ["list", input] => {
            let archive = Archive::load(input)?;
            for file in archive.files() {
                println!("{:>10}  {}", file.size(), file.path);
            }
        }
        ["unarc", input, dir] => Archive::load(input)?.extract_to(dir)?,
        ["arc", dir, output] => Archive::from_directory(dir)?.save(output)?,
        _ => eprintln!(
            "usage: program unlz <in.lz> <out> | lz <smb|smbdx|fzgx|fzax> <in> <out.lz>\n\
             \x20      | list <in.arc> | unarc <in.arc> <dir> | arc <dir> <out.arc>"
        ),
    }

    Ok(())
}
