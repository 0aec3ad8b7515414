//! Archive extraction for release assets
//!
//! Windows assets are ZIP archives, everything else ships as `.tar.gz`.
//! Both formats are unpacked whole into the destination directory.

use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::debug;
use tar::Archive;
use zip::ZipArchive;

use super::error::{SetupError, SetupResult};
use super::platform::ArchiveFormat;

/// Unpack a `.tar.gz` archive into `dest`
pub async fn extract_tar(archive: &Path, dest: &Path) -> SetupResult<()> {
    let archive_path = archive.to_path_buf();
    let dest = dest.to_path_buf();

    run_blocking(archive, move || {
        let file = std::fs::File::open(&archive_path).map_err(|e| e.to_string())?;
        let mut tar = Archive::new(GzDecoder::new(file));
        tar.unpack(&dest).map_err(|e| e.to_string())
    })
    .await
}

/// Unpack a `.zip` archive into `dest`
pub async fn extract_zip(archive: &Path, dest: &Path) -> SetupResult<()> {
    let archive_path = archive.to_path_buf();
    let dest = dest.to_path_buf();

    run_blocking(archive, move || {
        let file = std::fs::File::open(&archive_path).map_err(|e| e.to_string())?;
        let mut zip = ZipArchive::new(file).map_err(|e| format!("failed to read ZIP archive: {e}"))?;
        zip.extract(&dest).map_err(|e| e.to_string())
    })
    .await
}

/// Create `dest` and unpack `archive` into it using the given format
pub async fn extract_archive(
    archive: &Path,
    format: ArchiveFormat,
    dest: &Path,
) -> SetupResult<PathBuf> {
    tokio::fs::create_dir_all(dest)
        .await
        .map_err(|source| SetupError::FileWrite {
            path: dest.to_path_buf(),
            source,
        })?;

    debug!("Extracting {} ({format:?}) into {}", archive.display(), dest.display());
    match format {
        ArchiveFormat::Zip => extract_zip(archive, dest).await?,
        ArchiveFormat::TarGz => extract_tar(archive, dest).await?,
    }

    Ok(dest.to_path_buf())
}

// Archive decoding is CPU-bound; keep it off the async workers
async fn run_blocking<F>(archive: &Path, job: F) -> SetupResult<()>
where
    F: FnOnce() -> Result<(), String> + Send + 'static,
{
    let extraction_error = |message: String| SetupError::Extraction {
        archive: archive.to_path_buf(),
        message,
    };

    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| extraction_error(format!("extraction task failed: {e}")))?
        .map_err(extraction_error)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Build a `.tar.gz` holding `files` (name, contents)
    pub(crate) fn write_tar_gz(path: &Path, files: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, *contents).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    /// Build a `.zip` holding `files` (name, contents)
    pub(crate) fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, contents) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents).unwrap();
        }
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn unpacks_tar_gz() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("cli.tar.gz");
        write_tar_gz(&archive, &[("exo", b"#!/bin/sh\n"), ("LICENSE", b"mit")]);

        let dest = dir.path().join("out");
        let root = extract_archive(&archive, ArchiveFormat::TarGz, &dest).await.unwrap();

        assert_eq!(root, dest);
        assert_eq!(std::fs::read(dest.join("exo")).unwrap(), b"#!/bin/sh\n");
        assert!(dest.join("LICENSE").exists());
    }

    #[tokio::test]
    async fn unpacks_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("cli.zip");
        write_zip(&archive, &[("exo.exe", b"MZ")]);

        let dest = dir.path().join("out");
        extract_archive(&archive, ArchiveFormat::Zip, &dest).await.unwrap();

        assert_eq!(std::fs::read(dest.join("exo.exe")).unwrap(), b"MZ");
    }

    #[tokio::test]
    async fn corrupt_archive_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"not a zip").unwrap();

        let err = extract_archive(&archive, ArchiveFormat::Zip, &dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::Extraction { archive: ref a, .. } if a == &archive));
    }
}
