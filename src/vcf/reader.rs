use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use noodles::bgzf;

/// Path that stands for standard input
pub const STDIN_PATH: &str = "-";

fn is_bgzf_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("gz") | Some("bgz")
    )
}

/// Open a record stream for line-by-line reading.
///
/// `-` reads standard input; `.gz`/`.bgz` files are decoded as BGZF, anything
/// else is read as plain text. Plain gzip is not BGZF and is rejected when the
/// first block is read.
pub fn open_vcf(path: impl AsRef<Path>) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();

    if path.as_os_str() == STDIN_PATH {
        debug!("Reading records from standard input");
        return Ok(Box::new(BufReader::new(io::stdin())));
    }

    if is_bgzf_path(path) {
        debug!("Reading BGZF-compressed records from {}", path.display());
        let mut reader = bgzf::reader::Builder
            .build_from_path(path)
            .with_context(|| format!("Failed to open VCF file: {}", path.display()))?;
        reader.fill_buf().with_context(|| {
            format!(
                "Failed to read {} as BGZF. Compressed input must be written by bgzip, \
                 plain gzip is not supported",
                path.display()
            )
        })?;
        return Ok(Box::new(reader));
    }

    debug!("Reading plain-text records from {}", path.display());
    let file =
        File::open(path).with_context(|| format!("Failed to open VCF file: {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    #[rstest]
    #[case("data.vcf.gz", true)]
    #[case("data.vcf.bgz", true)]
    #[case("data.vcf", false)]
    #[case("data", false)]
    fn test_is_bgzf_path(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_bgzf_path(Path::new(path)), expected);
    }

    #[test]
    fn test_open_bgzf_and_plain() {
        let dir = TempDir::new().unwrap();
        let text = "#CHROM\tPOS\n";

        let plain = dir.path().join("plain.vcf");
        std::fs::write(&plain, text).unwrap();

        let compressed = dir.path().join("compressed.vcf.gz");
        let mut writer = bgzf::Writer::new(File::create(&compressed).unwrap());
        writer.write_all(text.as_bytes()).unwrap();
        writer.finish().unwrap();

        for path in [plain, compressed] {
            let mut content = String::new();
            open_vcf(&path).unwrap().read_to_string(&mut content).unwrap();
            assert_eq!(content, text);
        }
    }

    #[test]
    fn test_open_missing_file() {
        assert!(open_vcf("does/not/exist.vcf").is_err());
    }

    #[test]
    fn test_open_non_bgzf_gz_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.vcf.gz");
        std::fs::write(
            &path,
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n1\t100\trs1\tA\tG\t.\tPASS\t.\n",
        )
        .unwrap();

        let message = format!("{:#}", open_vcf(&path).err().unwrap());
        assert!(message.contains("as BGZF"), "{}", message);
        assert!(message.contains("plain gzip is not supported"), "{}", message);
    }
}
