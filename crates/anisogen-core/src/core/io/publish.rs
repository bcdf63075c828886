use super::artifacts::CsvArtifactError;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes a CSV file next to `path` and renames it into place, so readers see
/// either the previous complete file or the new complete file.
pub fn publish_csv<F>(path: &Path, fill: F) -> Result<(), CsvArtifactError>
where
    F: FnOnce(&mut csv::Writer<&mut NamedTempFile>) -> csv::Result<()>,
{
    let display = path.to_string_lossy().to_string();
    let io_error = |source: std::io::Error| CsvArtifactError::Io {
        path: display.clone(),
        source,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(io_error)?;
    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    {
        let mut writer = csv::Writer::from_writer(&mut file);
        fill(&mut writer).map_err(|source| CsvArtifactError::Csv {
            path: display.clone(),
            source,
        })?;
        writer.flush().map_err(io_error)?;
    }
    file.as_file().sync_all().map_err(io_error)?;
    file.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn replaces_existing_file_in_one_step() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "old\n").unwrap();

        publish_csv(&path, |writer| {
            writer.write_record(["a", "b"])?;
            writer.write_record(["1", "2"])
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a,b\n1,2\n");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn failed_fill_leaves_previous_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "old\n").unwrap();

        let result = publish_csv(&path, |writer| {
            writer.write_record(["a", "b"])?;
            writer.write_record(["only-one"])
        });

        assert!(matches!(result, Err(CsvArtifactError::Csv { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\n");
    }
}
