use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use nif_rig_lib::import::report::WarningSeverity;
use nif_rig_lib::skeleton::{Game, ReferenceSkeleton, SkeletonDictionary};
use nif_rig_lib::{ImportBatch, ImportOptions, ImportSession};

struct Args {
    batches: Vec<PathBuf>,
    reference: Option<PathBuf>,
    options: Option<PathBuf>,
    dictionary: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let parsed = match parse_args(&args[1..]) {
        Some(parsed) => parsed,
        None => {
            eprintln!("Usage:");
            eprintln!(
                "  rig-inspect <batch.json>... [--reference <skeleton.json>] \
                 [--options <options.json>] [--dictionary <dictionary.json>]"
            );
            eprintln!();
            eprintln!("Examples:");
            eprintln!("  rig-inspect body.json hands.json --reference skeleton.json");
            eprintln!("  RUST_LOG=debug rig-inspect head.json --options fo4.json");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&parsed) {
        eprintln!("rig-inspect failed: {:?}", e);
        std::process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Option<Args> {
    let mut parsed = Args {
        batches: Vec::new(),
        reference: None,
        options: None,
        dictionary: None,
    };

    let mut i = 0;
    while i < args.len() {
        let slot = match args[i].as_str() {
            "--reference" => &mut parsed.reference,
            "--options" => &mut parsed.options,
            "--dictionary" => &mut parsed.dictionary,
            flag if flag.starts_with("--") => {
                eprintln!("Unknown flag '{}'", flag);
                return None;
            }
            path => {
                parsed.batches.push(PathBuf::from(path));
                i += 1;
                continue;
            }
        };
        let value = args.get(i + 1).filter(|v| !v.starts_with("--"))?;
        *slot = Some(PathBuf::from(value));
        i += 2;
    }

    if parsed.batches.is_empty() {
        None
    } else {
        Some(parsed)
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let options = match &args.options {
        Some(path) => ImportOptions::from_json_path(path)
            .with_context(|| format!("Failed to read options {}", path.display()))?,
        None => ImportOptions::default(),
    };

    let batches = args
        .batches
        .iter()
        .map(|path| {
            ImportBatch::from_json_path(path)
                .with_context(|| format!("Failed to read batch {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let dictionary = load_dictionary(args.dictionary.as_deref(), &options, &batches)?;
    eprintln!(
        "Dictionary: {} ({} bones, {:?} naming)",
        dictionary.name(),
        dictionary.len(),
        options.naming_mode
    );

    let reference = match &args.reference {
        Some(path) => Some(
            ReferenceSkeleton::from_json_path(path)
                .with_context(|| format!("Failed to read reference skeleton {}", path.display()))?,
        ),
        None => None,
    };

    let mut session = ImportSession::new(dictionary, reference, options);
    for (path, batch) in args.batches.iter().zip(&batches) {
        let outcome = session
            .import_batch(&batch.scene(), &batch.shapes)
            .with_context(|| format!("Import of {} failed", path.display()))?;

        println!("== {}", path.display());
        for shape in &outcome.shapes {
            let armature = shape
                .armature
                .and_then(|id| session.armature(id))
                .map(|a| a.name.as_str())
                .unwrap_or("-");
            println!(
                "  {:<24} {:?} -> {}{}",
                shape.name,
                shape.placement_source,
                armature,
                if shape.flagged_for_review { " (review)" } else { "" }
            );
        }
        println!(
            "  bones created: {}, synthesis: {}",
            outcome.bones_created,
            if outcome.synthesis_active { "on" } else { "off" }
        );
        for item in &outcome.report.items {
            let marker = match item.severity {
                WarningSeverity::Review => "!",
                WarningSeverity::Warning => "*",
                WarningSeverity::Info => "-",
            };
            println!(
                "  {} [{}] {}: {}",
                marker,
                item.shape.as_deref().unwrap_or("-"),
                item.code,
                item.message
            );
        }
    }

    println!();
    for armature in session.armatures() {
        ptree::print_tree(&armature.to_tree()).context("Failed to print armature")?;
    }
    Ok(())
}

fn load_dictionary(
    path: Option<&Path>,
    options: &ImportOptions,
    batches: &[ImportBatch],
) -> anyhow::Result<SkeletonDictionary> {
    if let Some(path) = path {
        return SkeletonDictionary::from_json_path(path)
            .with_context(|| format!("Failed to read dictionary {}", path.display()));
    }

    let game = match options.game {
        Some(game) => game,
        None => {
            let names: Vec<String> = batches
                .iter()
                .flat_map(|b| b.nodes.iter().map(|n| n.name.clone()))
                .collect();
            Game::detect(&names)
                .ok_or_else(|| anyhow!("Could not detect the game; set \"game\" in the options"))?
        }
    };
    Ok(SkeletonDictionary::for_game(game)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_batches_and_flags() {
        let parsed = parse_args(&args(&[
            "body.json",
            "--reference",
            "skeleton.json",
            "hands.json",
            "--options",
            "fo4.json",
        ]))
        .unwrap();

        assert_eq!(
            parsed.batches,
            vec![PathBuf::from("body.json"), PathBuf::from("hands.json")]
        );
        assert_eq!(parsed.reference, Some(PathBuf::from("skeleton.json")));
        assert_eq!(parsed.options, Some(PathBuf::from("fo4.json")));
        assert_eq!(parsed.dictionary, None);
    }

    #[test]
    fn test_flag_without_value() {
        assert!(parse_args(&args(&["body.json", "--reference"])).is_none());
        assert!(parse_args(&args(&["body.json", "--reference", "--options", "o.json"])).is_none());
    }

    #[test]
    fn test_unknown_flag() {
        assert!(parse_args(&args(&["body.json", "--verbose"])).is_none());
    }

    #[test]
    fn test_batch_required() {
        assert!(parse_args(&args(&[])).is_none());
        assert!(parse_args(&args(&["--dictionary", "creature.json"])).is_none());
    }
}
