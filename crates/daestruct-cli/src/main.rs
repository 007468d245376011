use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use daestruct_algo::{structural_rank, StructuralAnalyzer};
use daestruct_cli::{load_config, Cli, Commands, Model, OutputFormat};
use daestruct_core::AnalysisResult;
use tabwriter::TabWriter;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    match &cli.command {
        Commands::Analyse {
            model,
            format,
            config,
        } => run_analyse(model, *format, config.as_deref()),
        Commands::Stats { model } => run_stats(model),
    }
}

fn run_analyse(path: &Path, format: OutputFormat, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let model = Model::load(path)?;
    let matrix = model.to_matrix()?;
    info!(model = %path.display(), dimension = matrix.dimension(), "analysing");

    let result = StructuralAnalyzer::new()
        .with_config(config)
        .analyse(&matrix)
        .with_context(|| format!("analysing {}", path.display()))?;

    match format {
        OutputFormat::Table => print_offsets(&result),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

fn print_offsets(result: &AnalysisResult) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "EQUATION\tOFFSET\tSOLVES FOR")?;
    for (i, (&c, &j)) in result.c.iter().zip(&result.row_assignment).enumerate() {
        writeln!(writer, "{i}\t{c}\t{j}")?;
    }
    writeln!(writer)?;
    writeln!(writer, "VARIABLE\tOFFSET")?;
    for (j, &d) in result.d.iter().enumerate() {
        writeln!(writer, "{j}\t{d}")?;
    }
    writeln!(writer)?;
    writeln!(writer, "structural index\t{}", result.structural_index())?;
    writer.flush()?;
    Ok(())
}

fn run_stats(path: &Path) -> Result<()> {
    let model = Model::load(path)?;
    let matrix = model.to_matrix()?;
    let (rank, _) = structural_rank(&matrix);

    println!("Statistics for {}:", path.display());
    println!("  Dimension       : {}", matrix.dimension());
    println!("  Non-zeros       : {}", matrix.nnz());
    println!("  Density         : {:.4}", matrix.density());
    println!("  Structural rank : {rank}");
    if rank < matrix.dimension() {
        println!("  Structurally singular");
    }
    Ok(())
}
