//! Load the input tables from delimited text.
//!
//! Files ending in `.tsv` or `.txt` are tab-separated, anything else is comma-separated; a
//! trailing `.gz` is gunzipped on the fly (`data.tsv.gz` is a gzipped TSV).

use anyhow::{bail, format_err, Context, Error};
use flate2::bufread::MultiGzDecoder;
use ndarray::Array2;
use splice_types::{ExpressionMatrix, GeneFeatureTable, SampleMetadata};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Default name of the sample id column of a metadata table
pub const SAMPLE_ID_COLUMN: &str = "sample.id";
/// Gene id column of a feature table
pub const GENE_ID_COLUMN: &str = "gene_id";
/// Optional gene name column of a feature table
pub const GENE_NAME_COLUMN: &str = "gene_short_name";

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default()
}

/// Field delimiter implied by the file extension
pub fn delimiter_for(path: &Path) -> u8 {
    let name = file_name(path);
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    if name.ends_with(".tsv") || name.ends_with(".txt") {
        b'\t'
    } else {
        b','
    }
}

/// Open `path` for buffered reading, gunzipping when it ends in `.gz`.
pub fn open(path: impl AsRef<Path>) -> Result<Box<dyn BufRead>, Error> {
    let path = path.as_ref();
    let file = BufReader::new(File::open(path).with_context(|| path.display().to_string())?);
    if file_name(path).ends_with(".gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(file))
    }
}

fn csv_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Read a genes × cells expression matrix: a header `gene_id,<cell ids...>` followed by one row
/// per gene.
pub fn read_expression<R: Read>(reader: R, delimiter: u8) -> Result<ExpressionMatrix, Error> {
    let mut rdr = csv_reader(reader, delimiter);
    let header = rdr.headers()?.clone();
    if header.len() < 2 {
        bail!("expression header needs a gene id column and at least one cell");
    }
    let cell_ids: Vec<String> = header.iter().skip(1).map(String::from).collect();

    let mut gene_ids = Vec::new();
    let mut values = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        // header is line 1
        let line = line + 2;
        if record.len() != header.len() {
            bail!("line {}: {} fields, expected {}", line, record.len(), header.len());
        }
        gene_ids.push(record[0].to_string());
        for field in record.iter().skip(1) {
            let v = field
                .parse::<f64>()
                .with_context(|| format!("line {}: bad value '{}'", line, field))?;
            values.push(v);
        }
    }
    let matrix = Array2::from_shape_vec((gene_ids.len(), cell_ids.len()), values)?;
    ExpressionMatrix::new(gene_ids, cell_ids, matrix)
}

/// Read a metadata table with one row per sample. `id_column` holds the sample ids; every other
/// column is kept as strings.
pub fn read_metadata<R: Read>(reader: R, delimiter: u8, id_column: &str) -> Result<SampleMetadata, Error> {
    let mut rdr = csv_reader(reader, delimiter);
    let header = rdr.headers()?.clone();
    let id_pos = header
        .iter()
        .position(|h| h == id_column)
        .ok_or_else(|| format_err!("metadata has no '{}' column", id_column))?;

    let mut columns: Vec<Vec<String>> = vec![Vec::new(); header.len()];
    for record in rdr.records() {
        let record = record?;
        for (col, field) in columns.iter_mut().zip(record.iter()) {
            col.push(field.to_string());
        }
    }

    let sample_ids = std::mem::take(&mut columns[id_pos]);
    let mut metadata = SampleMetadata::new(sample_ids)?;
    for (i, (name, values)) in header.iter().zip(columns).enumerate() {
        if i != id_pos {
            metadata = metadata.with_column(name, values)?;
        }
    }
    Ok(metadata)
}

/// Read a feature table with a `gene_id` column and an optional `gene_short_name` column.
pub fn read_features<R: Read>(reader: R, delimiter: u8) -> Result<GeneFeatureTable, Error> {
    let mut rdr = csv_reader(reader, delimiter);
    let header = rdr.headers()?.clone();
    let id_pos = header
        .iter()
        .position(|h| h == GENE_ID_COLUMN)
        .ok_or_else(|| format_err!("feature table has no '{}' column", GENE_ID_COLUMN))?;
    let name_pos = header.iter().position(|h| h == GENE_NAME_COLUMN);

    let mut ids = Vec::new();
    let mut names = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let id = record.get(id_pos).ok_or_else(|| format_err!("feature row without a gene id"))?;
        ids.push(id.to_string());
        if let Some(p) = name_pos {
            let name = record.get(p).filter(|n| !n.is_empty()).unwrap_or(id);
            names.push(name.to_string());
        }
    }
    GeneFeatureTable::new(ids, names)
}

/// Read one id per line, skipping blank lines.
pub fn read_id_list<R: BufRead>(reader: R) -> Result<Vec<String>, Error> {
    let mut ids = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let id = line.trim();
        if !id.is_empty() {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

/// Load an expression matrix from `path`
pub fn load_expression(path: impl AsRef<Path>) -> Result<ExpressionMatrix, Error> {
    let path = path.as_ref();
    read_expression(open(path)?, delimiter_for(path)).with_context(|| path.display().to_string())
}

/// Load a metadata table from `path`
pub fn load_metadata(path: impl AsRef<Path>, id_column: &str) -> Result<SampleMetadata, Error> {
    let path = path.as_ref();
    read_metadata(open(path)?, delimiter_for(path), id_column).with_context(|| path.display().to_string())
}

/// Load a feature table from `path`
pub fn load_features(path: impl AsRef<Path>) -> Result<GeneFeatureTable, Error> {
    let path = path.as_ref();
    read_features(open(path)?, delimiter_for(path)).with_context(|| path.display().to_string())
}

/// Load an id list from `path`
pub fn load_id_list(path: impl AsRef<Path>) -> Result<Vec<String>, Error> {
    let path = path.as_ref();
    read_id_list(open(path)?).with_context(|| path.display().to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use ndarray::array;
    use std::io::Write;

    #[test]
    fn test_delimiter() {
        assert_eq!(delimiter_for(Path::new("a/expr.csv")), b',');
        assert_eq!(delimiter_for(Path::new("a/expr.csv.gz")), b',');
        assert_eq!(delimiter_for(Path::new("meta.TSV")), b'\t');
        assert_eq!(delimiter_for(Path::new("meta.txt.gz")), b'\t');
        assert_eq!(delimiter_for(Path::new("noext")), b',');
    }

    #[test]
    fn test_read_expression() {
        let text = "gene_id,c1,c2,c3\ng1,0,1.5,2\ng2,3,0,0\n";
        let m = read_expression(text.as_bytes(), b',').unwrap();
        assert_eq!(m.gene_ids, vec!["g1", "g2"]);
        assert_eq!(m.cell_ids, vec!["c1", "c2", "c3"]);
        assert_eq!(m.matrix, array![[0.0, 1.5, 2.0], [3.0, 0.0, 0.0]]);

        let ragged = "gene_id,c1,c2\ng1,0\n";
        assert!(read_expression(ragged.as_bytes(), b',').is_err());
        let bad = "gene_id,c1\ng1,x\n";
        let err = read_expression(bad.as_bytes(), b',').unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn test_read_metadata() {
        let text = "cell.type\tsample.id\tbatch\nT\tc1\t1\nB\tc2\t2\n";
        let md = read_metadata(text.as_bytes(), b'\t', SAMPLE_ID_COLUMN).unwrap();
        assert_eq!(md.sample_ids, vec!["c1", "c2"]);
        assert_eq!(md.column("cell.type").unwrap(), &["T".to_string(), "B".to_string()][..]);
        assert_eq!(md.column_names().collect::<Vec<_>>(), vec!["batch", "cell.type"]);
        assert!(!md.has_column(SAMPLE_ID_COLUMN));

        assert!(read_metadata(text.as_bytes(), b'\t', "barcode").is_err());
    }

    #[test]
    fn test_read_features() {
        let text = "gene_id,gene_short_name\ng1,ACTB\ng2,\n";
        let f = read_features(text.as_bytes(), b',').unwrap();
        assert_eq!(f.gene_ids, vec!["g1", "g2"]);
        assert_eq!(f.gene_names, vec!["ACTB", "g2"]);

        let ids_only = read_features("gene_id\ng1\ng2\n".as_bytes(), b',').unwrap();
        assert_eq!(ids_only.gene_names, ids_only.gene_ids);
        assert!(read_features("id\ng1\n".as_bytes(), b',').is_err());
    }

    #[test]
    fn test_read_id_list() {
        let ids = read_id_list(" g1\n\ng2 \n\n".as_bytes()).unwrap();
        assert_eq!(ids, vec!["g1", "g2"]);
    }

    #[test]
    fn test_gzip_roundtrip() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"gene_id\tc1\tc2\ng1\t1\t2\n").unwrap();
        let bytes = enc.finish().unwrap();
        let m = read_expression(MultiGzDecoder::new(&bytes[..]), b'\t').unwrap();
        assert_eq!(m.matrix, array![[1.0, 2.0]]);
    }
}
