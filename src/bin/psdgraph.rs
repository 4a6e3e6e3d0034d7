use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "psdgraph", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a document snapshot into a node graph.
    Compile(CompileArgs),
    /// Print the structural signature of a document snapshot.
    Signature(DocArgs),
    /// Evaluate the compiled graph for constant per-texture samples.
    Eval(EvalArgs),
}

#[derive(Parser, Debug)]
struct DocArgs {
    /// Input document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Document name used to build texture names (defaults to the file stem).
    #[arg(long)]
    name: Option<String>,
}

#[derive(Parser, Debug)]
struct CompileArgs {
    #[command(flatten)]
    doc: DocArgs,

    /// Output graph JSON path (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print the canonical wiring instead of the graph JSON.
    #[arg(long)]
    wiring: bool,

    /// Skip cosmetic frame nodes.
    #[arg(long)]
    no_frames: bool,
}

#[derive(Parser, Debug)]
struct EvalArgs {
    #[command(flatten)]
    doc: DocArgs,

    /// JSON object mapping texture names to `[r, g, b, a]`.
    #[arg(long)]
    samples: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Compile(args) => cmd_compile(args),
        Command::Signature(args) => cmd_signature(args),
        Command::Eval(args) => cmd_eval(args),
    }
}

fn read_document(path: &Path) -> anyhow::Result<psdgraph::LayerList> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read document '{}'", path.display()))?;
    let tree = psdgraph::DocumentTree::from_json(&text)
        .with_context(|| format!("parse document '{}'", path.display()))?;
    let list = tree.to_layer_list()?;
    anyhow::ensure!(!list.is_empty(), "document '{}' has no layers", path.display());
    Ok(list)
}

fn lookup_for(args: &DocArgs) -> psdgraph::NamedImageLookup {
    let name = args.name.clone().unwrap_or_else(|| {
        args.in_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    psdgraph::NamedImageLookup::new(name)
}

fn cmd_compile(args: CompileArgs) -> anyhow::Result<()> {
    let list = read_document(&args.doc.in_path)?;
    let opts = psdgraph::CompileOpts {
        emit_frames: !args.no_frames,
        ..psdgraph::CompileOpts::default()
    };
    let graph = psdgraph::compile_layers(&list, &lookup_for(&args.doc), &opts);

    let text = if args.wiring {
        graph.canonical_wiring()
    } else {
        serde_json::to_string_pretty(&graph).context("serialize graph")?
    };

    match &args.out {
        Some(out) => {
            if let Some(parent) = out.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(out, text)
                .with_context(|| format!("write graph '{}'", out.display()))?;
            eprintln!(
                "wrote {} ({} nodes, {} placeholders)",
                out.display(),
                graph.len(),
                graph.placeholder_count()
            );
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn cmd_signature(args: DocArgs) -> anyhow::Result<()> {
    let list = read_document(&args.in_path)?;
    let sig = psdgraph::compute_signature(&list);
    println!("{sig}");
    println!("{}", sig.as_str());
    Ok(())
}

fn cmd_eval(args: EvalArgs) -> anyhow::Result<()> {
    let list = read_document(&args.doc.in_path)?;
    let graph = psdgraph::compile_layers(
        &list,
        &lookup_for(&args.doc),
        &psdgraph::CompileOpts::default(),
    );

    let f = File::open(&args.samples)
        .with_context(|| format!("open samples '{}'", args.samples.display()))?;
    let raw: BTreeMap<psdgraph::ImageKey, [f32; 4]> =
        serde_json::from_reader(BufReader::new(f)).context("parse samples JSON")?;
    let samples: BTreeMap<psdgraph::ImageKey, psdgraph::Rgba> =
        raw.into_iter().map(|(k, v)| (k, v.into())).collect();

    let out = psdgraph::evaluate(&graph, &samples)?;
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
