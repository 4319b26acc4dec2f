//! Subcommand implementations.
//!
//! Each command walks one backup with a [`FrameDecryptor`] and returns the
//! session counters; report text goes to the caller's writer.

use std::{
    error::Error,
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use sigframe_backup::{
    DecryptorConfig, EncryptorConfig, FrameDecryptor, FrameEncryptor, SessionStats, SharedSource,
};
use sigframe_proto::{Frame, FrameKind, HeaderFrame, MacStatus};

/// Longest statement prefix shown by `inspect`.
const STATEMENT_PREVIEW: usize = 72;

/// Result type for commands.
pub type CommandResult<T> = Result<T, Box<dyn Error>>;

/// Write one line per frame, then the session summary.
pub fn inspect(
    backup: &Path,
    passphrase: &str,
    config: DecryptorConfig,
    out: &mut impl Write,
) -> CommandResult<SessionStats> {
    let mut decryptor = FrameDecryptor::open(SharedSource::file(backup), passphrase, config)?;

    for decoded in decryptor.by_ref() {
        let decoded = decoded?;
        let mac = match decoded.mac {
            MacStatus::Verified => "ok",
            MacStatus::Bad => "BAD",
            MacStatus::Unauthenticated => "-",
        };
        writeln!(
            out,
            "{:>6} {:>10} {:<18} {:<3} {}",
            decoded.sequence,
            decoded.offset,
            decoded.frame.kind().name(),
            mac,
            describe(&decoded.frame)
        )?;
    }

    let stats = decryptor.finish();
    writeln!(out, "{stats}")?;
    Ok(stats)
}

/// Write every attachment, sticker and avatar body to `out_dir`, one file
/// each, named after its stream position.
///
/// Bodies that cannot be read are logged and skipped. Returns the number of
/// files written alongside the counters.
pub fn dump_attachments(
    backup: &Path,
    passphrase: &str,
    config: DecryptorConfig,
    out_dir: &Path,
) -> CommandResult<(usize, SessionStats)> {
    fs::create_dir_all(out_dir)?;
    let mut decryptor = FrameDecryptor::open(SharedSource::file(backup), passphrase, config)?;
    let mut written = 0;

    for decoded in decryptor.by_ref() {
        let mut decoded = decoded?;
        if decoded.frame.declared_length().unwrap_or(0) == 0 {
            continue;
        }

        let kind = decoded.frame.kind();
        let payload = match decoded.frame.attachment_data(config.verbose) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(sequence = decoded.sequence, %kind, error = %err, "skipping unreadable body");
                continue;
            },
        };
        if payload.mac == MacStatus::Bad {
            tracing::warn!(sequence = decoded.sequence, %kind, "writing body that failed authentication");
        }

        let path = out_dir.join(format!("{:06}-{}.bin", decoded.sequence, kind.name().replace(' ', "-")));
        fs::write(&path, &payload.data)?;
        tracing::debug!(path = %path.display(), len = payload.data.len(), "wrote body");
        written += 1;

        decoded.frame.clear_data();
    }

    Ok((written, decryptor.finish()))
}

/// Decode `backup` and write it again to `output` under a new passphrase,
/// with a fresh IV and salt.
pub fn reencrypt(
    backup: &Path,
    passphrase: &str,
    config: DecryptorConfig,
    output: &Path,
    new_passphrase: &str,
    new_config: EncryptorConfig,
) -> CommandResult<SessionStats> {
    let mut decryptor = FrameDecryptor::open(SharedSource::file(backup), passphrase, config)?;

    let mut iv = [0u8; HeaderFrame::IV_SIZE];
    let mut salt = [0u8; 32];
    getrandom::fill(&mut iv)?;
    getrandom::fill(&mut salt)?;
    let header = HeaderFrame::new(iv, &salt, decryptor.header().version()?);

    let writer = BufWriter::new(File::create(output)?);
    let mut encryptor = FrameEncryptor::new(writer, new_passphrase, &header, new_config)?;

    for decoded in decryptor.by_ref() {
        let mut decoded = decoded?;
        if matches!(decoded.frame.kind(), FrameKind::Header | FrameKind::End) {
            continue;
        }
        if decoded.mac == MacStatus::Bad {
            tracing::warn!(sequence = decoded.sequence, "re-encrypting frame that failed authentication");
        }
        encryptor.write_frame(&mut decoded.frame)?;
    }

    let stats = decryptor.finish();
    if !stats.complete {
        tracing::warn!("input had no end frame, output will have one");
    }
    let frames = encryptor.frames_written();
    encryptor.finish()?;
    tracing::info!(output = %output.display(), frames, "re-encrypted backup");
    Ok(stats)
}

/// Short per-kind detail for `inspect`.
fn describe(frame: &Frame) -> String {
    match frame {
        Frame::Header(f) => match f.version().ok().flatten() {
            Some(version) => format!("format version {version}"),
            None => String::new(),
        },
        Frame::DatabaseVersion(f) => f.version().map(|v| format!("schema {v}")).unwrap_or_default(),
        Frame::SqlStatement(f) => {
            let statement = f.statement().unwrap_or_default();
            let preview: String = statement.chars().take(STATEMENT_PREVIEW).collect();
            let params = f.parameters().map(|p| p.len()).unwrap_or(0);
            let ellipsis = if preview.len() < statement.len() { "..." } else { "" };
            format!("{preview}{ellipsis} [{params} params]")
        },
        Frame::SharedPreference(f) => format!(
            "{}:{}",
            f.file().ok().flatten().unwrap_or_default(),
            f.key().ok().flatten().unwrap_or_default()
        ),
        Frame::KeyValue(f) => f.key().unwrap_or_default().to_owned(),
        Frame::Attachment(f) => format!(
            "row {} id {} ({} bytes)",
            f.row_id().unwrap_or(0),
            f.attachment_id().unwrap_or(0),
            frame.attachment_size()
        ),
        Frame::Sticker(f) => {
            format!("row {} ({} bytes)", f.row_id().unwrap_or(0), frame.attachment_size())
        },
        Frame::Avatar(f) => {
            let owner = f.recipient().ok().flatten().or_else(|| f.name().ok().flatten()).unwrap_or_default();
            format!("{owner} ({} bytes)", frame.attachment_size())
        },
        Frame::End(_) => String::new(),
    }
}
