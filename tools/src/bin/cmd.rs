// Command line utility for running the splice-rs PCA pipeline

use anyhow::{bail, Context, Error};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use ndarray::prelude::*;
use splice_rs::filter::IdPolicy;
use splice_rs::palette::Color;
use splice_rs::pipeline::{run_pca_analysis, AnalysisResults, PcaAnalysis, PcaParams};
use splice_rs::table_io::{load_expression, load_features, load_id_list, load_metadata, SAMPLE_ID_COLUMN};
use splice_types::{GeneFeatureTable, SingleCellDataset};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

fn path_arg(name: &'static str, long: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .help(help)
        .long(long)
        .value_parser(value_parser!(PathBuf))
}

fn cli() -> Command {
    Command::new("splice-rs-cmd")
        .about("PCA of single-cell expression, colored by cell group")
        .arg(
            Arg::new("EXPRESSION")
                .help("genes x cells expression table (csv/tsv, optionally gzipped)")
                .required(true)
                .index(1)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(path_arg("METADATA", "metadata", "per-cell metadata table").short('m').required(true))
        .arg(path_arg("FEATURES", "features", "gene feature table with gene_id and gene_short_name"))
        .arg(path_arg("GENES", "genes", "genes to consider, one id per line (default: every gene)").short('g'))
        .arg(path_arg("SAMPLES", "samples", "restrict to these sample ids, one per line"))
        .arg(
            Arg::new("ID_COLUMN")
                .help("metadata column holding the sample ids")
                .long("id_column")
                .default_value(SAMPLE_ID_COLUMN),
        )
        .arg(
            Arg::new("GROUP_COLUMN")
                .help("metadata column holding the cell groups")
                .short('c')
                .long("group_column")
                .required(true),
        )
        .arg(
            Arg::new("GROUP_ORDER")
                .help("groups to keep, in display order")
                .long("group_order")
                .value_delimiter(','),
        )
        .arg(
            Arg::new("COLORS")
                .help("group colors as #RRGGBB")
                .long("colors")
                .value_delimiter(','),
        )
        .arg(
            Arg::new("MIN_CELLS")
                .help("minimum number of cells expressing a gene")
                .long("min_cells")
                .default_value("25")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("NUM_PCS")
                .help("Number of principal components to retain")
                .short('d')
                .long("num_pcs")
                .default_value("20")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("COMPONENTS")
                .help("components on the x and y axes")
                .long("components")
                .value_delimiter(',')
                .default_values(["1", "2"])
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("POINT_SIZE")
                .long("point_size")
                .default_value("1.0")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("ALPHA")
                .long("alpha")
                .default_value("0.75")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("STROKE")
                .long("stroke")
                .default_value("0.1")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("STRICT")
                .help("fail on requested ids missing from the tables")
                .long("strict")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("OUT_DIR")
                .help("Output directory")
                .short('o')
                .long("out_dir")
                .default_value(".")
                .value_parser(value_parser!(PathBuf)),
        )
}

fn strings(matches: &ArgMatches, id: &str) -> Option<Vec<String>> {
    matches.get_many::<String>(id).map(|v| v.cloned().collect())
}

fn params_from(matches: &ArgMatches, dataset: &SingleCellDataset) -> Result<PcaParams, Error> {
    let group_column: &String = matches.get_one("GROUP_COLUMN").context("no group column")?;
    let gene_ids = match matches.get_one::<PathBuf>("GENES") {
        Some(path) => load_id_list(path)?,
        None => dataset.expression.gene_ids.clone(),
    };

    let mut params = PcaParams::new(group_column.as_str(), gene_ids);
    params.filter.sample_ids = match matches.get_one::<PathBuf>("SAMPLES") {
        Some(path) => Some(load_id_list(path)?),
        None => None,
    };
    params.filter.group_order = strings(matches, "GROUP_ORDER");
    params.filter.min_cells = *matches.get_one("MIN_CELLS").context("no min_cells")?;
    if matches.get_flag("STRICT") {
        params.filter.id_policy = IdPolicy::Strict;
    }
    params.ncp = *matches.get_one("NUM_PCS").context("no num_pcs")?;

    let components: Vec<usize> = matches.get_many::<usize>("COMPONENTS").into_iter().flatten().copied().collect();
    let [x, y] = components[..] else {
        bail!("expected two components, got {:?}", components);
    };
    params.plot.components = [x, y];
    params.plot.group_colors = strings(matches, "COLORS")
        .map(|colors| colors.iter().map(|c| c.parse::<Color>()).collect::<Result<Vec<_>, _>>())
        .transpose()?;
    params.plot.style.size = *matches.get_one("POINT_SIZE").context("no point size")?;
    params.plot.style.alpha = *matches.get_one("ALPHA").context("no alpha")?;
    params.plot.style.stroke = *matches.get_one("STROKE").context("no stroke")?;
    Ok(params)
}

pub fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = cli().get_matches();

    let out_dir: &PathBuf = matches.get_one("OUT_DIR").context("no output directory")?;
    let id_column: &String = matches.get_one("ID_COLUMN").context("no id column")?;
    let expression = load_expression(matches.get_one::<PathBuf>("EXPRESSION").context("no expression table")?)?;
    let metadata = load_metadata(
        matches.get_one::<PathBuf>("METADATA").context("no metadata table")?,
        id_column,
    )?;
    let genes = match matches.get_one::<PathBuf>("FEATURES") {
        Some(path) => load_features(path)?,
        None => GeneFeatureTable::new(expression.gene_ids.clone(), vec![])?,
    };
    info!(
        "loaded {} genes x {} cells, {} metadata rows",
        expression.num_genes(),
        expression.num_cells(),
        metadata.num_rows()
    );
    let dataset = SingleCellDataset::new(expression, metadata, genes)?;

    let params = params_from(&matches, &dataset)?;
    let results = AnalysisResults::default().with_pca(run_pca_analysis(&dataset, &params)?);

    create_dir_all(out_dir).with_context(|| out_dir.display().to_string())?;
    if let Some(pca) = &results.pca {
        write_pca(pca, out_dir)?;
    }
    Ok(())
}

fn write_pca(pca: &PcaAnalysis, out_dir: &Path) -> Result<(), Error> {
    let proj = &pca.projection;
    let pcs: Vec<String> = (1..=proj.num_components()).map(|i| format!("PC{i}")).collect();

    let mut header = vec!["cell_id".to_string()];
    header.extend(pcs.iter().cloned());
    array_to_csv(&proj.coordinates, &proj.cell_ids, &header, out_dir.join("pca_coordinates.csv.gz"))?;

    let mut header = vec!["gene_id".to_string()];
    header.extend(pcs);
    array_to_csv(&proj.loadings, &proj.gene_ids, &header, out_dir.join("pca_loadings.csv.gz"))?;

    let path = out_dir.join("pca_variance.csv");
    let mut writer = csv::Writer::from_path(&path).with_context(|| path.display().to_string())?;
    for v in &proj.variance {
        writer.serialize(v)?;
    }
    writer.flush()?;

    let path = out_dir.join("pca_plot.json");
    std::fs::write(&path, pca.plot.to_json()?).with_context(|| path.display().to_string())?;
    info!("wrote PCA results to {}", out_dir.display());
    Ok(())
}

/// Write a labelled matrix as gzipped CSV, one row per label
pub fn array_to_csv(
    array: &Array2<f64>,
    row_labels: &[String],
    header: &[String],
    path: impl AsRef<Path>,
) -> Result<(), Error> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| path.display().to_string())?;
    let mut writer = BufWriter::new(GzEncoder::new(file, Compression::default()));
    writeln!(writer, "{}", header.join(","))?;
    for (label, row) in row_labels.iter().zip(array.axis_iter(Axis(0))) {
        write!(writer, "{}", label)?;
        for entry in row.iter() {
            write!(writer, ",{}", *entry)?;
        }
        writeln!(writer)?;
    }
    writer.into_inner().map_err(|e| e.into_error())?.finish()?;
    Ok(())
}
