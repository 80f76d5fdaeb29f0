// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Input file validation: single-slot pipeline, audio MIME allowlist,
//! size ceiling.

pub const MAX_FILES: usize = 1;
pub const MAX_SIZE_BYTES: u64 = 100 * 1024 * 1024; // 100MB

/// MIME types accepted as audio input. Several formats show up under
/// multiple names depending on the OS and browser doing the sniffing.
pub const ALLOWED_AUDIO_TYPES: &[&str] = &[
    "audio/mpeg",              // .mp3
    "audio/wav",               // .wav
    "audio/ogg",               // .ogg
    "audio/mp4",               // .m4a
    "audio/aac",               // .aac
    "audio/x-aac",             // .aac (alternative MIME type)
    "audio/aacp",              // .aac (another alternative)
    "audio/webm",              // .webm
    "audio/x-m4a",             // .m4a (alternative MIME type)
    "audio/x-wav",             // .wav (alternative MIME type)
    "audio/flac",              // .flac
    "audio/x-flac",            // .flac (alternative MIME type)
    "audio/x-mpeg",            // .aac (some systems use this)
    "audio/mp4a-latm",         // .aac (another variant)
    "audio/aac-adts",          // .aac (ADTS format)
    "audio/vnd.dlna.adts",     // .aac (DLNA ADTS format)
    "audio/vnd.dlna.adts.aac", // .aac (another DLNA format)
    "audio/vnd.dlna.adts.aacp", // .aac (another DLNA format)
];

/// Validates a candidate input file before it reaches the engine.
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_files: usize,
    max_size: u64,
    allowed_types: &'static [&'static str],
}

impl Default for FileValidator {
    fn default() -> Self {
        Self {
            max_files: MAX_FILES,
            max_size: MAX_SIZE_BYTES,
            allowed_types: ALLOWED_AUDIO_TYPES,
        }
    }
}

impl FileValidator {
    /// Validate a candidate file. Returns a user-facing message on
    /// rejection, `None` when the file is acceptable.
    pub fn validate(
        &self,
        current_files: usize,
        media_type: &str,
        size_bytes: u64,
    ) -> Option<String> {
        if current_files >= self.max_files {
            let plural = if self.max_files > 1 { "s" } else { "" };
            return Some(format!(
                "You can only upload {} audio file{}",
                self.max_files, plural
            ));
        }

        let media_type_lower = media_type.to_ascii_lowercase();
        let allowed = self
            .allowed_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&media_type_lower));
        if !allowed {
            return Some(format!(
                "Only audio files are allowed. Received type: {media_type}"
            ));
        }

        if size_bytes > self.max_size {
            return Some(format!(
                "File size must be less than {}MB",
                self.max_size / (1024 * 1024)
            ));
        }

        None
    }

    /// Comma-joined allowlist, suitable for a file picker `accept` attribute.
    pub fn accepted_types(&self) -> String {
        self.allowed_types.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_audio() {
        let validator = FileValidator::default();
        assert_eq!(validator.validate(0, "audio/mpeg", 1024), None);
        assert_eq!(validator.validate(0, "audio/flac", 1024), None);
        assert_eq!(validator.validate(0, "AUDIO/WAV", 1024), None);
    }

    #[test]
    fn test_rejects_non_audio() {
        let validator = FileValidator::default();
        let msg = validator.validate(0, "video/mp4", 1024).unwrap();
        assert!(msg.contains("Only audio files"));
        assert!(msg.contains("video/mp4"));
    }

    #[test]
    fn test_rejects_second_file() {
        let validator = FileValidator::default();
        let msg = validator.validate(1, "audio/mpeg", 1024).unwrap();
        assert_eq!(msg, "You can only upload 1 audio file");
    }

    #[test]
    fn test_rejects_oversized_file() {
        let validator = FileValidator::default();
        let msg = validator
            .validate(0, "audio/mpeg", MAX_SIZE_BYTES + 1)
            .unwrap();
        assert_eq!(msg, "File size must be less than 100MB");
        // Exactly at the limit is fine
        assert_eq!(validator.validate(0, "audio/mpeg", MAX_SIZE_BYTES), None);
    }

    #[test]
    fn test_accepted_types_joined() {
        let validator = FileValidator::default();
        let accepted = validator.accepted_types();
        assert!(accepted.starts_with("audio/mpeg,audio/wav"));
        assert!(accepted.contains("audio/x-flac"));
    }
}
