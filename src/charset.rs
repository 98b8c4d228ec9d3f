//! Character set detection and transcoding.
//!
//! Input bytes are sniffed once to pick a charset, then decoded to UTF-8 as a
//! stream. The detected charset travels with the read result so a later write
//! can reuse it explicitly.

use chardetng::EncodingDetector;
use encoding_rs::{Decoder, DecoderResult, Encoding, UTF_8};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use crate::error::CsvError;

/// Number of leading bytes inspected by [`detect`].
pub const SNIFF_LEN: usize = 4096;

/// Size of the chunks a [`DecodingReader`] pulls from its source.
pub const CHUNK_LEN: usize = 8192;

/// A text encoding understood by the codec.
///
/// Wraps an `encoding_rs` encoding. The default is UTF-8, which is also the
/// fallback when detection is inconclusive.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use csv_mapper::Charset;
///
/// let charset = Charset::from_str("sjis").unwrap();
/// assert_eq!(charset.to_string(), "Shift_JIS");
/// assert_eq!(Charset::default().to_string(), "UTF-8");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset(&'static Encoding);

impl Charset {
    /// UTF-8.
    pub fn utf8() -> Self {
        Charset(UTF_8)
    }

    /// Wraps an `encoding_rs` encoding.
    pub fn new(encoding: &'static Encoding) -> Self {
        Charset(encoding)
    }

    /// Returns the underlying encoding.
    pub fn encoding(&self) -> &'static Encoding {
        self.0
    }

    /// Returns the canonical name, e.g. `Shift_JIS`.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Returns the charset text is actually encoded in on output.
    ///
    /// `encoding_rs` cannot produce UTF-16 or `replacement`, so those map to
    /// UTF-8. Every other charset maps to itself.
    pub fn output(&self) -> Charset {
        Charset(self.0.output_encoding())
    }

    /// Encodes text for output in [`Charset::output`].
    ///
    /// Characters that the charset cannot represent are an `InvalidData`
    /// error.
    pub fn encode<'a>(&self, text: &'a str) -> io::Result<Cow<'a, [u8]>> {
        let (bytes, used, had_errors) = self.0.encode(text);
        if had_errors {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("text cannot be represented in {}", used.name()),
            ));
        }
        Ok(bytes)
    }
}

impl Default for Charset {
    fn default() -> Self {
        Charset::utf8()
    }
}

impl FromStr for Charset {
    type Err = CsvError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Encoding::for_label(s.trim().as_bytes())
            .map(Charset)
            .ok_or_else(|| CsvError::UnknownCharset(s.to_string()))
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Charset {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Charset {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Charset::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Guesses the charset of `bytes`, the leading part of an input.
///
/// A byte order mark wins outright and pure ASCII reports UTF-8. Anything
/// else goes to `chardetng`, which scores the candidate encodings on the
/// byte statistics of the text. The guess is kept only if it decodes `bytes`
/// without a malformed sequence. When `bytes` is shorter than [`SNIFF_LEN`]
/// it is taken as the whole input, otherwise an incomplete sequence at the
/// very end is tolerated. Returns `None` when the guess does not fit.
pub fn detect(bytes: &[u8]) -> Option<Charset> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        debug!("Detected {} from byte order mark", encoding.name());
        return Some(Charset(encoding));
    }
    if bytes.is_ascii() {
        return Some(Charset::utf8());
    }

    let complete = bytes.len() < SNIFF_LEN;
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, complete);
    let guess = detector.guess(None, true);

    if decodes_cleanly(guess, bytes, complete) {
        debug!("Detected charset {}", guess.name());
        Some(Charset(guess))
    } else {
        debug!("Guessed {} but the input does not decode with it", guess.name());
        None
    }
}

/// Returns `true` if `bytes` contains no malformed sequence for `encoding`.
fn decodes_cleanly(encoding: &'static Encoding, bytes: &[u8], last: bool) -> bool {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let capacity = match decoder.max_utf8_buffer_length_without_replacement(bytes.len()) {
        Some(capacity) => capacity,
        None => return false,
    };
    let mut out = String::with_capacity(capacity);
    let (result, _) = decoder.decode_to_string_without_replacement(bytes, &mut out, last);
    matches!(result, DecoderResult::InputEmpty)
}

/// Streams bytes in some charset out as UTF-8.
///
/// A leading byte order mark is removed. Malformed input surfaces as an
/// `InvalidData` I/O error naming the charset. At most one input chunk and its
/// decoded text are buffered at a time.
pub struct DecodingReader<R> {
    inner: R,
    decoder: Decoder,
    charset: Charset,
    input: Vec<u8>,
    output: String,
    consumed: usize,
    finished: bool,
}

impl<R: Read> DecodingReader<R> {
    /// Wraps `inner`, decoding it as `charset`.
    pub fn new(inner: R, charset: Charset) -> Self {
        DecodingReader {
            inner,
            decoder: charset.encoding().new_decoder_with_bom_removal(),
            charset,
            input: vec![0; CHUNK_LEN],
            output: String::new(),
            consumed: 0,
            finished: false,
        }
    }

    /// Returns the charset being decoded.
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Decodes the next input chunk into `output`.
    fn refill(&mut self) -> io::Result<()> {
        let n = self.inner.read(&mut self.input)?;
        let last = n == 0;

        self.output.clear();
        self.consumed = 0;
        let capacity = self
            .decoder
            .max_utf8_buffer_length_without_replacement(n)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "input chunk too large"))?;
        self.output.reserve(capacity);

        let (result, _) =
            self.decoder
                .decode_to_string_without_replacement(&self.input[..n], &mut self.output, last);
        match result {
            DecoderResult::InputEmpty => {}
            DecoderResult::Malformed(_, _) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("input is not valid {}", self.charset),
                ));
            }
            DecoderResult::OutputFull => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "decoder output buffer exhausted",
                ));
            }
        }

        // The decoder must not be called again once `last` was passed.
        self.finished = last;
        Ok(())
    }
}

impl<R: Read> Read for DecodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let pending = &self.output.as_bytes()[self.consumed..];
            if !pending.is_empty() {
                let n = pending.len().min(buf.len());
                buf[..n].copy_from_slice(&pending[..n]);
                self.consumed += n;
                return Ok(n);
            }
            if self.finished {
                return Ok(0);
            }
            self.refill()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::value::{Error as ValueError, StrDeserializer};
    use serde::de::IntoDeserializer;
    use encoding_rs::{EUC_JP, SHIFT_JIS, UTF_16LE, WINDOWS_1252};
    use std::io::{BufRead, BufReader, Cursor};

    fn read_all(bytes: &[u8], charset: Charset) -> io::Result<String> {
        let mut text = String::new();
        DecodingReader::new(Cursor::new(bytes.to_vec()), charset).read_to_string(&mut text)?;
        Ok(text)
    }

    #[test]
    fn test_from_str_accepts_labels() {
        assert_eq!(Charset::from_str("utf8").unwrap(), Charset::utf8());
        assert_eq!(Charset::from_str(" Shift_JIS ").unwrap().name(), "Shift_JIS");
        assert_eq!(Charset::from_str("euc-jp").unwrap().name(), "EUC-JP");
    }

    #[test]
    fn test_from_str_rejects_unknown_label() {
        let err = Charset::from_str("klingon").unwrap_err();
        assert!(matches!(err, CsvError::UnknownCharset(ref l) if l == "klingon"));
    }

    #[test]
    fn test_serde_uses_label() {
        let deserializer: StrDeserializer<ValueError> = "windows-1252".into_deserializer();
        let charset = Charset::deserialize(deserializer).unwrap();
        assert_eq!(charset.name(), "windows-1252");

        let deserializer: StrDeserializer<ValueError> = "nonsense".into_deserializer();
        assert!(Charset::deserialize(deserializer).is_err());
    }

    const KANA: &str = "いいえ,はい\nありがとう,どういたしまして\nおはようございます,こんにちは\n";

    const JAPANESE: &str = "名前,読み,所在地\n\
東京タワー,とうきょうたわー,東京都港区芝公園\n\
大阪城,おおさかじょう,大阪府大阪市中央区\n\
清水寺,きよみずでら,京都府京都市東山区\n";

    const FRENCH: &str = "nom,description\n\
café,boisson chaude très appréciée\n\
naïve,se dit d'une personne crédule\n\
crème brûlée,dessert à la française\n\
à bientôt,formule de politesse\n";

    fn encode(encoding: &'static Encoding, text: &str) -> Vec<u8> {
        let (bytes, _, had_errors) = encoding.encode(text);
        assert!(!had_errors);
        bytes.into_owned()
    }

    #[test]
    fn test_detect_ascii_and_utf8() {
        assert_eq!(detect(b"a,b,c\n"), Some(Charset::utf8()));
        assert_eq!(detect(JAPANESE.as_bytes()), Some(Charset::utf8()));
        assert_eq!(detect(b""), Some(Charset::utf8()));
    }

    #[test]
    fn test_detect_shift_jis() {
        let bytes = encode(SHIFT_JIS, JAPANESE);
        assert_eq!(detect(&bytes), Some(Charset::new(SHIFT_JIS)));
    }

    #[test]
    fn test_detect_euc_jp_kana() {
        let bytes = encode(EUC_JP, KANA);
        assert_eq!(detect(&bytes), Some(Charset::new(EUC_JP)));
    }

    #[test]
    fn test_detect_euc_jp_kanji_and_kana() {
        let bytes = encode(EUC_JP, JAPANESE);
        assert_eq!(detect(&bytes), Some(Charset::new(EUC_JP)));
    }

    #[test]
    fn test_detect_single_byte_latin() {
        let bytes = encode(WINDOWS_1252, FRENCH);
        let charset = detect(&bytes).unwrap();
        assert_ne!(charset, Charset::utf8());

        let (text, malformed) = charset.encoding().decode_without_bom_handling(&bytes);
        assert!(!malformed);
        assert_eq!(text, FRENCH);
    }

    #[test]
    fn test_detect_bom() {
        let bytes = [0xFF, 0xFE, b'a', 0x00];
        assert_eq!(detect(&bytes).unwrap().name(), "UTF-16LE");
    }

    #[test]
    fn test_detect_tolerates_cut_sequence_in_long_prefix() {
        let text = "東京,大阪\n".repeat(SNIFF_LEN / 10);
        // 4096 is not a multiple of the 14-byte line, so the cut lands inside a character.
        let bytes = &text.as_bytes()[..SNIFF_LEN];
        assert!(std::str::from_utf8(bytes).is_err());
        assert_eq!(detect(bytes), Some(Charset::utf8()));
    }

    #[test]
    fn test_decoding_reader_transcodes() {
        let (bytes, _, _) = SHIFT_JIS.encode("東京,大阪\n");
        let text = read_all(&bytes, Charset::new(SHIFT_JIS)).unwrap();
        assert_eq!(text, "東京,大阪\n");
    }

    #[test]
    fn test_decoding_reader_strips_bom() {
        let text = read_all(b"\xEF\xBB\xBFa,b", Charset::utf8()).unwrap();
        assert_eq!(text, "a,b");
    }

    #[test]
    fn test_decoding_reader_rejects_malformed() {
        let err = read_all(b"a,\xFF\n", Charset::utf8()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_decoding_reader_spans_chunks() {
        let line = "あいうえお,かきくけこ\n".repeat(CHUNK_LEN / 8);
        let decoding = DecodingReader::new(Cursor::new(line.into_bytes()), Charset::utf8());
        let reader = BufReader::with_capacity(7, decoding);
        let lines: Vec<String> = reader.lines().collect::<io::Result<_>>().unwrap();
        assert_eq!(lines.len(), CHUNK_LEN / 8);
        assert!(lines.iter().all(|l| l == "あいうえお,かきくけこ"));
    }

    #[test]
    fn test_output_charset() {
        assert_eq!(Charset::new(SHIFT_JIS).output(), Charset::new(SHIFT_JIS));
        assert_eq!(Charset::new(UTF_16LE).output(), Charset::utf8());
        assert_eq!(&*Charset::new(UTF_16LE).encode("a").unwrap(), b"a");
    }

    #[test]
    fn test_encode_rejects_unmappable() {
        let charset = Charset::new(SHIFT_JIS);
        assert_eq!(&*charset.encode("abc").unwrap(), b"abc");
        assert!(charset.encode("😀").is_err());
    }
}
