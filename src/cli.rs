//! Command-line argument parsing

use std::path::PathBuf;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    pub paths: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub password: Option<String>,
    pub unordered: bool,
    pub save_options: bool,
}

pub fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse(&args) {
        Some(parsed) => parsed,
        None => print_help(),
    }
}

/// `None` when help was asked for or an option is missing its value
fn parse(args: &[String]) -> Option<Args> {
    let mut parsed = Args::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                i += 1;
                parsed.output = Some(PathBuf::from(args.get(i)?));
            }
            "-p" | "--password" => {
                i += 1;
                parsed.password = Some(args.get(i)?.clone());
            }
            "-u" | "--unordered" => parsed.unordered = true,
            "--save-options" => parsed.save_options = true,
            "-h" | "--help" => return None,
            path => parsed.paths.push(PathBuf::from(path)),
        }
        i += 1;
    }

    Some(parsed)
}

fn print_help() -> ! {
    eprintln!("Usage: zipnav [OPTIONS] [PATHS...]");
    eprintln!();
    eprintln!("Packs files and folders into an archive. A single archive given as");
    eprintln!("input is imported, so it can be repacked with another password.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -o, --output FILE      Archive to write [default: archive.zip]");
    eprintln!("  -p, --password PASS    Password for protected input and for the output");
    eprintln!("  -u, --unordered        Write entries sorted by path instead of tree order");
    eprintln!("      --save-options     Persist the options above to the config file");
    eprintln!("  -h, --help             Show this help message");
    eprintln!();
    eprintln!("Logging is controlled with RUST_LOG (default: zipnav=info).");
    std::process::exit(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_paths_and_options() {
        let parsed = parse(&args(&["a.txt", "-o", "out.zip", "dir", "-p", "pw", "-u"])).unwrap();
        assert_eq!(parsed.paths, vec![PathBuf::from("a.txt"), PathBuf::from("dir")]);
        assert_eq!(parsed.output, Some(PathBuf::from("out.zip")));
        assert_eq!(parsed.password.as_deref(), Some("pw"));
        assert!(parsed.unordered);
        assert!(!parsed.save_options);
    }

    #[test]
    fn test_parse_missing_value_or_help() {
        assert!(parse(&args(&["-o"])).is_none());
        assert!(parse(&args(&["x", "--help"])).is_none());
        assert_eq!(parse(&[]).unwrap(), Args::default());
    }
}
