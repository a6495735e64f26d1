use logos::{Lexer, Logos};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Link-layer (IEEE EUI-64) address of a neighbor.
///
/// The textual form is the short EUI-64 notation used by the management
/// interface: four hexadecimal groups separated by `:`, with the
/// universal/local bit of the first byte flipped.
///
/// ```
/// # use plexi_core::LinkAddr;
/// let addr: LinkAddr = "215:8d00:57:6466".parse().unwrap();
/// assert_eq!(addr.as_bytes(), &[0x00, 0x15, 0x8d, 0x00, 0x00, 0x57, 0x64, 0x66]);
/// assert_eq!(addr.to_string(), "215:8d00:57:6466");
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkAddr([u8; LinkAddr::SIZE]);

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")] // Ignore this regex pattern between tokens
enum AddrToken {
    #[token(":")]
    Separator,

    #[regex("[0-9a-fA-F]+")]
    Group,
}

/// Error returned when parsing a [`LinkAddr`] from its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddrParseError {
    #[error("Expecting hexadecimal group {index} of the address")]
    ExpectedGroup { index: usize },
    #[error("Expecting ':' after group {index} of the address")]
    ExpectedSeparator { index: usize },
    #[error("Group {index} of the address does not fit in 16 bits")]
    GroupOverflow { index: usize },
    #[error("Not expecting any other tokens after the address")]
    TrailingInput,
}

impl LinkAddr {
    pub const SIZE: usize = 8;

    /// the null address, used where a link has no designated neighbor
    pub const NULL: Self = Self([0; Self::SIZE]);

    const GROUPS: usize = 4;
    const UNIVERSAL_LOCAL_BIT: u8 = 0x02;

    pub const fn new(bytes: [u8; Self::SIZE]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; Self::SIZE] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self == &Self::NULL
    }
}

impl From<[u8; LinkAddr::SIZE]> for LinkAddr {
    fn from(bytes: [u8; LinkAddr::SIZE]) -> Self {
        Self(bytes)
    }
}

impl FromStr for LinkAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::<'_, AddrToken>::new(s);
        let mut bytes = [0; Self::SIZE];

        for index in 0..Self::GROUPS {
            if index > 0 {
                let Some(Ok(AddrToken::Separator)) = lex.next() else {
                    return Err(AddrParseError::ExpectedSeparator { index: index - 1 });
                };
            }
            let Some(Ok(AddrToken::Group)) = lex.next() else {
                return Err(AddrParseError::ExpectedGroup { index });
            };
            let group = u16::from_str_radix(lex.slice(), 16)
                .map_err(|_| AddrParseError::GroupOverflow { index })?;
            let [high, low] = group.to_be_bytes();
            bytes[2 * index] = high;
            bytes[2 * index + 1] = low;
        }

        if lex.next().is_some() {
            return Err(AddrParseError::TrailingInput);
        }

        bytes[0] ^= Self::UNIVERSAL_LOCAL_BIT;
        Ok(Self(bytes))
    }
}

impl fmt::Display for LinkAddr {
    /// Formats the short EUI-64 notation.
    ///
    /// The fifth byte is not part of the short notation and is not printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:x}{:02x}:{:02x}{:02x}:{:02x}:{:02x}{:02x}",
            b[0] ^ Self::UNIVERSAL_LOCAL_BIT,
            b[1],
            b[2],
            b[3],
            b[5],
            b[6],
            b[7],
        )
    }
}
