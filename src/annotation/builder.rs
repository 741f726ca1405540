use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::annotation::io::{AnnotationReader, ParseError};
use crate::catalog::ExonCatalog;
use crate::model::gene::{Gene, GeneId};

/// Configure which attribute keys are used to extract:
/// - gene stable identifier (used to intern -> GeneId)
/// - gene display names/aliases (stored in Gene.names)
/// - exon number label (stored on each segment)
///
/// Multiple keys are allowed per category; first present wins.
#[derive(Debug, Clone)]
pub struct CatalogKeys {
    pub gene_id_keys: Vec<String>,
    pub gene_name_keys: Vec<String>,
    pub exon_number_keys: Vec<String>,

    /// Feature types that count as exon blocks (default: ["exon"])
    pub exon_feature_types: Vec<String>,
}

impl Default for CatalogKeys {
    fn default() -> Self {
        Self {
            // Common GTF + some common variants
            gene_id_keys: vec!["gene_id".into(), "gene".into(), "GeneID".into()],
            gene_name_keys: vec!["gene_name".into(), "Name".into(), "gene".into()],
            exon_number_keys: vec!["exon_number".into(), "exon_id".into()],
            exon_feature_types: vec!["exon".into()],
        }
    }
}

/// High-level builder for creating an `ExonCatalog` from a GTF/GFF3 file.
///
/// - parses the whole file (optionally gzipped)
/// - configurable mapping of ID/NAME keys for genes and exon numbers
/// - builds genes + split exon segments + chromosome dictionary + buckets
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    pub bin_width: u32,
    pub keys: CatalogKeys,
}

impl CatalogBuilder {
    /// Start with defaults that work reasonably for many GTF/GFF3 files.
    pub fn new(bin_width: u32) -> Self {
        Self {
            bin_width,
            keys: CatalogKeys::default(),
        }
    }

    pub fn with_keys(bin_width: u32, keys: CatalogKeys) -> Self {
        Self { bin_width, keys }
    }

    /// Convenience: set a single key (or first-preference key) for gene id.
    pub fn gene_id_key(mut self, key: &str) -> Self {
        self.keys.gene_id_keys = vec![key.to_string()];
        self
    }

    /// Convenience: set preferred keys for gene display names/aliases.
    pub fn gene_name_keys(mut self, keys: &[&str]) -> Self {
        self.keys.gene_name_keys = keys.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Convenience: set exon number key(s).
    pub fn exon_number_keys(mut self, keys: &[&str]) -> Self {
        self.keys.exon_number_keys = keys.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Convenience: define what feature types count as exon blocks.
    pub fn exon_feature_types(mut self, types: &[&str]) -> Self {
        self.keys.exon_feature_types = types.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Build a catalog from anything implementing `BufRead`.
    ///
    /// Workflow:
    /// 1) parse records, keep exon features only
    /// 2) extract gene key, intern gene, add labelled exon block
    /// 3) finalize genes (split overlapping exons into segments)
    /// 4) derive per-chromosome reference sets and buckets
    pub fn build_from_reader<R: BufRead>(&self, reader: R) -> Result<ExonCatalog, ParseError> {
        let mut catalog = ExonCatalog::new(self.bin_width);

        // stable key string -> internal id
        let mut gene_key_to_id: HashMap<String, GeneId> = HashMap::new();

        for rec in AnnotationReader::new(reader).records() {
            let rec = rec?;

            if !rec.is_feature_of_type(&self.keys.exon_feature_types) {
                continue;
            }

            let chr_id = catalog.intern_chr(&rec.seqname);

            let gene_key = rec.pick_first_attr(&self.keys.gene_id_keys).ok_or_else(|| {
                ParseError::MissingAttribute {
                    line: format!("{} {}", rec.seqname, rec.block),
                    tried: self.keys.gene_id_keys.clone(),
                }
            })?;

            let gene_id = match gene_key_to_id.get(&gene_key) {
                Some(&gid) => gid,
                None => {
                    // Primary display name: first gene_name_keys present, else the key.
                    let primary = rec
                        .pick_first_attr(&self.keys.gene_name_keys)
                        .unwrap_or_else(|| gene_key.clone());
                    let gid = catalog.push_gene(Gene::new(
                        catalog.genes.len(),
                        primary,
                        chr_id,
                        rec.strand,
                    ));
                    gene_key_to_id.insert(gene_key.clone(), gid);
                    catalog.genes[gid].add_name(&gene_key);
                    gid
                }
            };

            // Keep alias names discovered on later lines too.
            for k in &self.keys.gene_name_keys {
                if let Some(v) = rec.attr(k) {
                    catalog.genes[gene_id].add_name(v);
                }
            }

            // Exon number: attribute if present, else ordinal within the gene
            // (some annotation sources leave exon_number out).
            let exon_number = rec
                .pick_first_attr(&self.keys.exon_number_keys)
                .unwrap_or_else(|| (catalog.genes[gene_id].raw_exon_count() + 1).to_string());

            catalog.genes[gene_id].add_exon(rec.block, exon_number);
        }

        catalog.finalize();
        Ok(catalog)
    }

    /// Build a catalog from a file path.
    ///
    /// - If the path ends with `.gz`, uses a gzip decoder.
    /// - Otherwise reads as plain text.
    pub fn build_from_path<P: AsRef<Path>>(&self, path: P) -> Result<ExonCatalog, ParseError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| ParseError::IoPath {
            path: path.display().to_string(),
            source: e,
        })?;

        let is_gz = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);

        if is_gz {
            let decoder = flate2::read::GzDecoder::new(file);
            self.build_from_reader(BufReader::new(decoder))
        } else {
            self.build_from_reader(BufReader::new(file))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Block, Strand};
    use std::io::Cursor;

    #[test]
    fn builder_gtf_default_keys_builds_catalog() {
        let gtf = "\
chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; gene_name \"Alpha\"; exon_number \"1\";
chr1\tsrc\texon\t201\t250\t.\t+\t.\tgene_id \"G1\"; gene_name \"Alpha\"; exon_number \"2\";
";
        let catalog = CatalogBuilder::new(100)
            .build_from_reader(Cursor::new(gtf.as_bytes()))
            .unwrap();

        assert_eq!(catalog.chr_names, vec!["chr1".to_string()]);
        assert_eq!(catalog.genes.len(), 1);
        assert_eq!(catalog.genes[0].primary_name(), Some("Alpha"));
        assert!(catalog.genes[0].names.iter().any(|n| n == "G1"));
        assert_eq!(catalog.genes[0].strand, Strand::Plus);

        // Exons converted to 0-based half-open: 101..150 => [100,150)
        let segs = catalog.genes[0].segments();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].block, Block::new(100, 150));
        assert_eq!(segs[0].label(), "1");

        assert_eq!(catalog.chr_buckets.len(), 1);
        assert!(catalog.chr_buckets[0].bins.iter().any(|b| b.contains(&0)));
    }

    #[test]
    fn builder_gff3_keys_build_catalog() {
        let gff = "\
chr2\tsrc\texon\t5\t20\t.\t-\t.\tID=ex1;gene_id=G9;Name=GeneNice
chr2\tsrc\texon\t30\t40\t.\t-\t.\tID=ex2;gene_id=G9;Name=GeneNice
";
        let builder = CatalogBuilder::new(50)
            .gene_id_key("gene_id")
            .gene_name_keys(&["Name"]);

        let catalog = builder.build_from_reader(Cursor::new(gff.as_bytes())).unwrap();

        assert_eq!(catalog.chr_names, vec!["chr2".to_string()]);
        assert_eq!(catalog.genes.len(), 1);
        assert_eq!(catalog.genes[0].strand, Strand::Minus);
        assert_eq!(catalog.genes[0].primary_name(), Some("GeneNice"));

        // GFF3 coordinates 5..20 => [4,20)
        assert_eq!(catalog.genes[0].segments()[0].block, Block::new(4, 20));
    }

    #[test]
    fn builder_respects_exon_feature_types_filter() {
        let gtf = "\
chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; exon_number \"1\";
chr1\tsrc\tCDS\t201\t250\t.\t+\t0\tgene_id \"G1\"; exon_number \"1\";
chr1\tsrc\tgene\t101\t250\t.\t+\t.\tgene_id \"G1\";
";
        let catalog = CatalogBuilder::new(100)
            .exon_feature_types(&["exon"])
            .build_from_reader(Cursor::new(gtf.as_bytes()))
            .unwrap();

        assert_eq!(catalog.genes.len(), 1);
        assert_eq!(catalog.genes[0].segments().len(), 1);
        assert_eq!(catalog.genes[0].segments()[0].block, Block::new(100, 150));
    }

    #[test]
    fn missing_exon_number_falls_back_to_ordinal() {
        let gtf = "\
chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\";
chr1\tsrc\texon\t201\t250\t.\t+\t.\tgene_id \"G1\";
";
        let catalog = CatalogBuilder::new(100)
            .build_from_reader(Cursor::new(gtf.as_bytes()))
            .unwrap();

        let segs = catalog.genes[0].segments();
        assert_eq!(segs[0].label(), "1");
        assert_eq!(segs[1].label(), "2");
    }

    #[test]
    fn missing_gene_id_is_an_error() {
        let gtf = "chr1\tsrc\texon\t101\t150\t.\t+\t.\texon_number \"1\";\n";
        let err = CatalogBuilder::new(100)
            .build_from_reader(Cursor::new(gtf.as_bytes()))
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingAttribute { .. }));
    }
}
