use crate::errors::AppError;
use uuid::Uuid;

/// Turns a scanned payload into an identity token.
pub trait ScanDecoder: Send + Sync {
    fn decode(&self, raw_payload: &[u8]) -> Result<String, AppError>;
}

/// Payloads are exactly the identity token: a lowercase hyphenated UUID.
/// Surrounding whitespace from keyboard-wedge scanners is tolerated; any other
/// spelling of the same UUID is not, so decoding stays injective.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenDecoder;

impl ScanDecoder for TokenDecoder {
    fn decode(&self, raw_payload: &[u8]) -> Result<String, AppError> {
        let text = std::str::from_utf8(raw_payload)
            .map_err(|_| AppError::UndecodableScan)?
            .trim();

        let uuid = Uuid::parse_str(text).map_err(|_| AppError::UndecodableScan)?;
        let canonical = uuid.to_string();
        if canonical != text {
            return Err(AppError::UndecodableScan);
        }

        Ok(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "6f1c2a4e-8d0b-4c6e-9f3a-2b7d5e1c0a94";

    #[test]
    fn accepts_canonical_tokens_with_line_endings() {
        assert_eq!(TokenDecoder.decode(TOKEN.as_bytes()).unwrap(), TOKEN);
        assert_eq!(
            TokenDecoder.decode(format!("{TOKEN}\r\n").as_bytes()).unwrap(),
            TOKEN
        );
    }

    #[test]
    fn rejects_everything_else() {
        let cases: [&[u8]; 6] = [
            b"",
            b"Juan Dela Cruz|2021-00001|Computer Science|Student",
            b"6F1C2A4E-8D0B-4C6E-9F3A-2B7D5E1C0A94",
            b"6f1c2a4e8d0b4c6e9f3a2b7d5e1c0a94",
            b"6f1c2a4e-8d0b-4c6e-9f3a-2b7d5e1c0a9",
            &[0xff, 0xfe, 0x00],
        ];
        for raw in cases {
            assert!(
                matches!(TokenDecoder.decode(raw), Err(AppError::UndecodableScan)),
                "{raw:?} should not decode"
            );
        }
    }
}
