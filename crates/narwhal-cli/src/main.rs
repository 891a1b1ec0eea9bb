use narwhal::{LayoutRequest, LayoutResult};
use serde::Serialize;
use std::io::Read;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Layout(narwhal::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Layout(err) => write!(f, "layout error: {err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<narwhal::Error> for CliError {
    fn from(value: narwhal::Error) -> Self {
        Self::Layout(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Partitions {
    Count(u32),
    /// One per available core.
    Auto,
}

#[derive(Debug, Default)]
struct Args {
    input: Option<String>,
    out: Option<String>,
    pretty: bool,
    seed: Option<u64>,
    partitions: Option<Partitions>,
}

fn usage() -> &'static str {
    "narwhal-cli\n\
\n\
USAGE:\n\
  narwhal-cli [--partitions <n>|auto] [--seed <n>] [--pretty] [--out <path>] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', the JSON layout request is read from stdin.\n\
  - The JSON layout result is printed to stdout unless --out is given.\n\
  - --partitions and --seed override the request's partitionCount and seed.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "--pretty" => args.pretty = true,
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--seed" => {
                let Some(seed) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.seed = Some(seed.parse::<u64>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--partitions" => {
                let Some(n) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.partitions = Some(match n.as_str() {
                    "auto" => Partitions::Auto,
                    n => Partitions::Count(
                        n.parse::<u32>()
                            .ok()
                            .filter(|n| *n > 0)
                            .ok_or(CliError::Usage(usage()))?,
                    ),
                });
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool, out: Option<&str>) -> Result<(), CliError> {
    let mut text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    text.push('\n');
    match out {
        None => print!("{text}"),
        Some(path) => std::fs::write(path, text)?,
    }
    Ok(())
}

fn apply_overrides(request: &mut LayoutRequest, args: &Args) {
    if let Some(seed) = args.seed {
        request.seed = seed;
    }
    match args.partitions {
        Some(Partitions::Count(n)) => request.partition_count = n,
        Some(Partitions::Auto) => {
            request.partition_count = std::thread::available_parallelism()
                .map(|n| n.get() as u32)
                .unwrap_or(1);
        }
        None => {}
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let mut request: LayoutRequest = serde_json::from_str(&text)?;
    apply_overrides(&mut request, &args);
    let result: LayoutResult = narwhal::layout(&request)?;
    write_json(&result, args.pretty, args.out.as_deref())
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("narwhal-cli")
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn flags_are_parsed() {
        let args = parse_args(&argv(&[
            "--partitions",
            "3",
            "--seed",
            "11",
            "--pretty",
            "--out",
            "o.json",
            "in.json",
        ]))
        .expect("args");
        assert_eq!(args.partitions, Some(Partitions::Count(3)));
        assert_eq!(args.seed, Some(11));
        assert!(args.pretty);
        assert_eq!(args.out.as_deref(), Some("o.json"));
        assert_eq!(args.input.as_deref(), Some("in.json"));
    }

    #[test]
    fn bad_flags_are_usage_errors() {
        for bad in [
            &["--partitions", "0"][..],
            &["--partitions"][..],
            &["--seed", "x"][..],
            &["--bogus"][..],
            &["a.json", "b.json"][..],
        ] {
            assert!(
                matches!(parse_args(&argv(bad)), Err(CliError::Usage(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn overrides_replace_request_fields() {
        let mut request: LayoutRequest = serde_json::from_str(
            r#"{"vertices": [], "bounds": {"width": 1, "height": 1}, "seed": 5}"#,
        )
        .expect("request");
        let args = parse_args(&argv(&["--seed", "9", "--partitions", "auto"])).expect("args");
        apply_overrides(&mut request, &args);
        assert_eq!(request.seed, 9);
        assert!(request.partition_count >= 1);
    }
}
