//! Ugoira decoding: ZIP container to frames, GIF or MP4.
//!
//! An ugoira work ships as a ZIP of JPEG frames plus a manifest of
//! per-frame delays. Depending on the requested [`UgoiraKind`], the
//! archive is passed through untouched, unpacked into frames in manifest
//! order, or transcoded by writing the frames and a concat demuxer
//! manifest to a scratch directory and invoking `ffmpeg`.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, instrument};
use zip::ZipArchive;

use crate::client::PixivClient;
use crate::error::Error;
use crate::model::illust::{Illust, IllustType, UgoiraFrame, UgoiraMetadata};
use crate::model::image::Quality;

/// The form an ugoira work is decoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UgoiraKind {
    /// The raw ZIP container, byte for byte.
    Zip,
    /// Individual frame images in manifest order.
    Frames,
    /// An animated GIF encoded by ffmpeg.
    Gif,
    /// An MP4 (H.265) encoded by ffmpeg.
    Mp4,
}

/// Decoded ugoira content.
#[derive(Debug, Clone)]
pub enum UgoiraContent {
    Zip(bytes::Bytes),
    Frames(Vec<bytes::Bytes>),
    Media(bytes::Bytes),
}

enum MediaTarget {
    Gif,
    Mp4,
}

impl MediaTarget {
    fn output_name(&self) -> &'static str {
        match self {
            Self::Gif => "out.gif",
            Self::Mp4 => "out.mp4",
        }
    }
}

/// Downloads and decodes an ugoira work at the given archive quality.
///
/// The frame manifest is fetched through [`Illust::ugoira_metadata`], so
/// repeat decodes of the same instance hit the metadata endpoint once.
///
/// # Errors
///
/// [`Error::ArtworkTypeMismatch`] when `illust` is not an ugoira work,
/// or any error from [`decode`].
pub async fn download(
    client: &PixivClient,
    illust: &Illust,
    quality: Quality,
    kind: UgoiraKind,
) -> Result<Option<UgoiraContent>, Error> {
    if illust.kind != IllustType::Ugoira {
        return Err(Error::ArtworkTypeMismatch {
            expected: "ugoira",
            actual: illust.kind.as_str().to_string(),
            hint: "use download for still works",
        });
    }
    let metadata = illust.ugoira_metadata(client).await?;
    decode(client, metadata, quality, kind).await
}

/// Downloads the archive named by `metadata` and decodes it.
///
/// The archive URL is picked at `quality`, falling back tier by tier and
/// finally to whatever link the metadata carries. Returns `None` when the
/// archive download comes back empty.
///
/// # Errors
///
/// [`Error::Archive`] for a corrupt container, [`Error::Encoder`] when
/// ffmpeg fails, or any download error.
#[instrument(skip(client, metadata))]
pub async fn decode(
    client: &PixivClient,
    metadata: &UgoiraMetadata,
    quality: Quality,
    kind: UgoiraKind,
) -> Result<Option<UgoiraContent>, Error> {
    let url = metadata
        .zip_urls
        .select(quality)
        .ok_or(Error::MissingUrl {
            what: "ugoira archive",
        })?;
    let data = client.download(url).await?;
    if data.is_empty() {
        return Ok(None);
    }
    debug!(bytes = data.len(), frames = metadata.frames.len(), "decoding ugoira archive");
    let content = match kind {
        UgoiraKind::Zip => UgoiraContent::Zip(data),
        UgoiraKind::Frames => UgoiraContent::Frames(extract_frames(&data, &metadata.frames)?),
        UgoiraKind::Gif => {
            UgoiraContent::Media(encode(&data, &metadata.frames, &MediaTarget::Gif).await?)
        }
        UgoiraKind::Mp4 => {
            UgoiraContent::Media(encode(&data, &metadata.frames, &MediaTarget::Mp4).await?)
        }
    };
    Ok(Some(content))
}

/// Unpacks the frames in manifest order, not archive order.
fn extract_frames(data: &[u8], frames: &[UgoiraFrame]) -> Result<Vec<bytes::Bytes>, Error> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let mut result = Vec::with_capacity(frames.len());
    for frame in frames {
        let mut entry = archive.by_name(&frame.file)?;
        let mut buffer = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry
            .read_to_end(&mut buffer)
            .map_err(|err| Error::io(&frame.file, err))?;
        result.push(bytes::Bytes::from(buffer));
    }
    Ok(result)
}

/// Concat demuxer manifest: one `file` plus `duration` line per frame,
/// delays converted from milliseconds to seconds.
fn concat_manifest(dir: &Path, frames: &[UgoiraFrame]) -> String {
    let mut manifest = String::new();
    for frame in frames {
        let path = dir.join(&frame.file);
        manifest.push_str(&format!("file {}\n", path.display()));
        manifest.push_str(&format!("duration {}\n", frame.delay as f64 / 1000.0));
    }
    manifest
}

const PALETTE_FILTER: &str =
    "[main]split[v1][v2];[v1]palettegen[pal];[v2][pal]paletteuse=dither=sierra2_4a";

/// The exact ffmpeg invocation per target. GIF runs the frames through a
/// bt470bg to bt709 color conversion and a generated palette; MP4 adds a
/// silent audio track, crops to even dimensions for the encoder and emits
/// 10-bit H.265.
fn ffmpeg_args(manifest: &Path, output: &Path, target: &MediaTarget) -> Vec<String> {
    let manifest = manifest.display().to_string();
    let output = output.display().to_string();
    match target {
        MediaTarget::Gif => vec![
            "-y".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            manifest,
            "-filter_complex".to_string(),
            format!("colormatrix=bt470bg:bt709[main];{PALETTE_FILTER}"),
            "-crf".to_string(),
            "0".to_string(),
            output,
        ],
        MediaTarget::Mp4 => vec![
            "-y".to_string(),
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            "anullsrc".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-filter_complex".to_string(),
            format!(
                "colormatrix=bt470bg:bt709[0];[0]crop='iw-mod(iw,2)':'ih-mod(ih,2)'[main];{PALETTE_FILTER}"
            ),
            "-i".to_string(),
            manifest,
            "-pix_fmt".to_string(),
            "yuv420p10le".to_string(),
            "-c:v".to_string(),
            "libx265".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-crf".to_string(),
            "0".to_string(),
            "-x265-params".to_string(),
            "profile=main10".to_string(),
            "-shortest".to_string(),
            output,
        ],
    }
}

/// Materializes the frames under a scratch directory and transcodes them.
async fn encode(
    data: &[u8],
    frames: &[UgoiraFrame],
    target: &MediaTarget,
) -> Result<bytes::Bytes, Error> {
    let scratch = tempfile::tempdir().map_err(|err| Error::io(std::env::temp_dir(), err))?;
    let dir = scratch.path();

    let images = extract_frames(data, frames)?;
    for (frame, image) in frames.iter().zip(&images) {
        let path = dir.join(&frame.file);
        tokio::fs::write(&path, image)
            .await
            .map_err(|err| Error::io(&path, err))?;
    }

    let manifest_path = dir.join("list.txt");
    tokio::fs::write(&manifest_path, concat_manifest(dir, frames))
        .await
        .map_err(|err| Error::io(&manifest_path, err))?;

    let output_path: PathBuf = dir.join(target.output_name());
    let output = Command::new("ffmpeg")
        .args(ffmpeg_args(&manifest_path, &output_path, target))
        .output()
        .await
        .map_err(Error::encoder_spawn)?;
    if !output.status.success() {
        return Err(Error::Encoder {
            status: output.status.code(),
            detail: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let media = tokio::fs::read(&output_path)
        .await
        .map_err(|err| Error::io(&output_path, err))?;
    Ok(bytes::Bytes::from(media))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn frame(file: &str, delay: u64) -> UgoiraFrame {
        UgoiraFrame {
            file: file.to_string(),
            delay,
        }
    }

    fn archive_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_frames_follow_manifest_order() {
        // Archive order deliberately reversed relative to the manifest.
        let data = archive_with(&[("000001.jpg", b"second"), ("000000.jpg", b"first")]);
        let frames = [frame("000000.jpg", 100), frame("000001.jpg", 200)];
        let extracted = extract_frames(&data, &frames).unwrap();
        assert_eq!(extracted.len(), 2);
        assert_eq!(&extracted[0][..], b"first");
        assert_eq!(&extracted[1][..], b"second");
    }

    #[test]
    fn test_missing_frame_is_archive_error() {
        let data = archive_with(&[("000000.jpg", b"first")]);
        let frames = [frame("000000.jpg", 100), frame("000001.jpg", 200)];
        assert!(matches!(
            extract_frames(&data, &frames),
            Err(Error::Archive { .. })
        ));
    }

    #[test]
    fn test_corrupt_container_is_archive_error() {
        let frames = [frame("000000.jpg", 100)];
        assert!(matches!(
            extract_frames(b"not a zip", &frames),
            Err(Error::Archive { .. })
        ));
    }

    #[test]
    fn test_manifest_lines_and_delay_precision() {
        let dir = Path::new("/tmp/scratch");
        let frames = [frame("000000.jpg", 100), frame("000001.jpg", 200)];
        let manifest = concat_manifest(dir, &frames);
        assert_eq!(
            manifest,
            "file /tmp/scratch/000000.jpg\n\
             duration 0.1\n\
             file /tmp/scratch/000001.jpg\n\
             duration 0.2\n"
        );
    }

    #[test]
    fn test_manifest_subsecond_fractions() {
        let manifest = concat_manifest(Path::new("/t"), &[frame("a.jpg", 33), frame("b.jpg", 1500)]);
        assert!(manifest.contains("duration 0.033\n"));
        assert!(manifest.contains("duration 1.5\n"));
    }

    #[test]
    fn test_gif_args_exact_order() {
        let args = ffmpeg_args(
            Path::new("/t/list.txt"),
            Path::new("/t/out.gif"),
            &MediaTarget::Gif,
        );
        assert_eq!(
            args,
            vec![
                "-y",
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                "/t/list.txt",
                "-filter_complex",
                "colormatrix=bt470bg:bt709[main];[main]split[v1][v2];[v1]palettegen[pal];[v2][pal]paletteuse=dither=sierra2_4a",
                "-crf",
                "0",
                "/t/out.gif",
            ]
        );
    }

    #[test]
    fn test_mp4_args_exact_order() {
        let args = ffmpeg_args(
            Path::new("/t/list.txt"),
            Path::new("/t/out.mp4"),
            &MediaTarget::Mp4,
        );
        assert_eq!(
            args,
            vec![
                "-y",
                "-f",
                "lavfi",
                "-i",
                "anullsrc",
                "-f",
                "concat",
                "-safe",
                "0",
                "-filter_complex",
                "colormatrix=bt470bg:bt709[0];[0]crop='iw-mod(iw,2)':'ih-mod(ih,2)'[main];[main]split[v1][v2];[v1]palettegen[pal];[v2][pal]paletteuse=dither=sierra2_4a",
                "-i",
                "/t/list.txt",
                "-pix_fmt",
                "yuv420p10le",
                "-c:v",
                "libx265",
                "-c:a",
                "aac",
                "-crf",
                "0",
                "-x265-params",
                "profile=main10",
                "-shortest",
                "/t/out.mp4",
            ]
        );
    }
}
