use atty::Stream;
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use extpack_core::{
    ArchiveScheduler, CacheFile, PackConfig, PackError, PackReport, PackageCollector,
    ProjectAssembler, ProjectSpec, Unit,
};
use tracing::debug;

mod cli;
mod style;

use cli::ExtpackCli;
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = ExtpackCli::parse();
    init_tracing(cli.verbose);

    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));
    run(&cli, &style)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "extpack_core={level},extpack_domain={level},extpackdist={level}"
        ))
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(cli: &ExtpackCli, style: &Style) -> Result<()> {
    let config = PackConfig::new(cli.output.clone())?.with_selected(cli.packages.iter());

    debug!(infos = %cli.infos, "loading project infos");
    let mut infos = CacheFile::load(&cli.infos).map_err(|err| eyre!("{err:#}"))?;
    if let Some(variant) = &cli.variant {
        infos = infos.with_variant(variant.as_str());
    }

    let units = PackageCollector::new(&infos, &config).collect()?;

    if cli.list {
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&units)?);
        } else if units.is_empty() {
            println!("{}", style.info("no packages to pack"));
        } else {
            println!("{}", format_unit_table(style, &units));
        }
        return Ok(());
    }

    config.ensure_output_dir()?;
    let report = match ArchiveScheduler::new(&config).pack_all(&units) {
        Ok(report) => report,
        Err(PackError::Scheduler { failed, archives }) => {
            print_report(style, &PackReport { archives });
            for name in &failed {
                println!("{}", style.failed(name));
            }
            return Err(eyre!("problem creating a pack: {}", failed.join(", ")));
        }
        Err(err) => return Err(err.into()),
    };
    print_report(style, &report);

    if cli.pack_all {
        let project =
            ProjectSpec::resolve(&infos, cli.pack_name.as_deref(), cli.pack_version.as_deref())?;
        let path = ProjectAssembler::new(&config).assemble(&units, &project)?;
        println!("{}", style.ok(&format!("{} -> {path}", project.dir_name())));
    }
    Ok(())
}

fn print_report(style: &Style, report: &PackReport) {
    for archive in &report.archives {
        println!("{}", style.ok(&format!("{} -> {}", archive.unit, archive.path)));
    }
}

fn format_unit_table(style: &Style, units: &[Unit]) -> String {
    let headers = ["Package", "Version", "Variant", "Root"];
    let rows: Vec<[&str; 4]> = units
        .iter()
        .map(|u| {
            [
                u.name.as_str(),
                u.version.as_str(),
                u.variant.as_str(),
                u.root.as_str(),
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let render = |cells: [&str; 4]| {
        format!(
            "{:<width0$}  {:<width1$}  {:<width2$}  {}",
            cells[0],
            cells[1],
            cells[2],
            cells[3],
            width0 = widths[0],
            width1 = widths[1],
            width2 = widths[2],
        )
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(style.table_header(render(headers).trim_end()));
    lines.push(format!(
        "{:-<width0$}  {:-<width1$}  {:-<width2$}  {:-<width3$}",
        "",
        "",
        "",
        "",
        width0 = widths[0],
        width1 = widths[1],
        width2 = widths[2],
        width3 = widths[3],
    ));
    for row in rows {
        lines.push(render(row));
    }
    lines.join("\n")
}
