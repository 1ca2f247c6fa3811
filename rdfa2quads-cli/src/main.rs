use std::{
    collections::HashMap,
    io::{Read, Write},
    process::ExitCode,
};

use clap::{Parser, ValueEnum};
use itertools::Itertools;
use oxrdf::{NamedOrBlankNode, Term};
use rdfa2quads::{Dataset, Input, ParseOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// URL, file path, or `-` to read HTML from stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Base IRI to resolve relative IRIs against
    #[arg(long)]
    base: Option<String>,

    /// Fail on HTML parse errors
    #[arg(long)]
    strict: bool,

    /// Skip rdfa:copy property copying
    #[arg(long)]
    no_copy: bool,

    #[arg(long, value_enum, default_value_t = Format::Nquads)]
    format: Format,

    /// More logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Nquads,
    Turtle,
    Pretty,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut options = ParseOptions::default()
        .with_strict_markup(args.strict)
        .with_property_copying(!args.no_copy);
    if let Some(base) = args.base {
        options = options.with_base(oxiri::Iri::parse(base)?);
    }

    let input = if args.input == "-" {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        Input::Markup(content)
    } else {
        Input::classify(args.input)
    };

    let dataset = match rdfa2quads::parse_with_options(input, &options) {
        Ok(dataset) => dataset,
        Err(err) => {
            eprintln!("Error: {err}");
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    tracing::debug!("{} quads", dataset.len());

    let mut out = std::io::stdout().lock();
    match args.format {
        Format::Nquads => write!(out, "{dataset}")?,
        Format::Turtle => write_turtle(&dataset, options.base.as_ref(), &mut out)?,
        Format::Pretty => write!(out, "{}", pretty(&dataset))?,
    }

    Ok(ExitCode::SUCCESS)
}

fn write_turtle(
    dataset: &Dataset,
    base: Option<&oxiri::Iri<String>>,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut serializer = oxttl::TurtleSerializer::new();
    if let Some(base) = base {
        serializer = serializer.with_base_iri(base.as_str())?;
    }

    // every prefix from the initial context
    let serializer = rdfa2quads::initial_context_prefixes()
        .mappings()
        .try_fold(serializer, |serializer, (prefix, iri)| {
            serializer.with_prefix(prefix, iri)
        })?;

    let mut writer = serializer.for_writer(out);
    for triple in dataset.to_graph().iter() {
        writer.serialize_triple(triple)?;
    }

    writer.finish()?;
    Ok(())
}

/// Turtle-like output grouped by subject, with prefixed names where
/// the initial context knows a prefix. Blank nodes nobody refers to print as `[]`.
fn pretty(dataset: &Dataset) -> String {
    let prefixes = rdfa2quads::initial_context_prefixes()
        .mappings()
        .filter(|(prefix, _)| !prefix.is_empty())
        .sorted_by_key(|(_, iri)| std::cmp::Reverse(iri.len()))
        .collect::<Vec<_>>();

    let compact = |iri: &str| {
        prefixes
            .iter()
            .find_map(|(prefix, value)| {
                iri.strip_prefix(value.as_str())
                    .map(|local| format!("{prefix}:{local}"))
            })
            .unwrap_or_else(|| format!("<{iri}>"))
    };

    let resource = |node: &NamedOrBlankNode| match node {
        NamedOrBlankNode::NamedNode(n) => compact(n.as_str()),
        NamedOrBlankNode::BlankNode(b) => b.to_string(),
    };

    let mut references: HashMap<&str, usize> = HashMap::new();
    for quad in dataset {
        if let Term::BlankNode(b) = &quad.object {
            *references.entry(b.as_str()).or_default() += 1;
        }
    }

    let mut output = String::new();
    // quads for one subject are adjacent
    for (subject, quads) in &dataset.iter().chunk_by(|quad| &quad.subject) {
        match subject {
            NamedOrBlankNode::BlankNode(b) if !references.contains_key(b.as_str()) => {
                output.push_str("[]");
            }
            _ => output.push_str(&resource(subject)),
        }
        output.push('\n');

        for (predicate, quads) in &quads.chunk_by(|quad| &quad.predicate) {
            output.push_str("  ");
            output.push_str(&resource(predicate));
            output.push(' ');

            let mut objects = quads.map(|quad| match &quad.object {
                Term::NamedNode(n) => compact(n.as_str()),
                Term::Literal(l) => match l.language() {
                    Some(_) => l.to_string(),
                    None if l.is_plain() => l.to_string(),
                    None => {
                        let datatype = l.datatype();
                        let typed = l.to_string();
                        let lexical = &typed[..typed.len() - datatype.as_str().len() - 4];
                        format!("{lexical}^^{}", compact(datatype.as_str()))
                    }
                },
                other => other.to_string(),
            });
            output.push_str(&objects.join(", "));
            output.push_str(" ;\n");
        }
        output.push_str(".\n\n");
    }
    output
}
