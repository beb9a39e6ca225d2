//! 对象类型 GUID。
//!
//! 二进制采用 Windows 混合字节序：前三段（4/2/2 字节）小端，末尾 8 字节按原样排列；
//! 文本采用 `8-4-4-4-12` 的十六进制分组，输出统一小写。

use core::{fmt, str::FromStr};

use crate::error::{Result, SddlError};

/// 16 字节的全局唯一标识符。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid {
    data1: u32,
    data2: u16,
    data3: u16,
    data4: [u8; 8],
}

/// GUID 的二进制长度。
pub const GUID_LEN: usize = 16;

const TEXT_LEN: usize = 36;
const HYPHENS: [usize; 4] = [8, 13, 18, 23];

impl Guid {
    /// 全零 GUID，在对象条目中等价于“未提供”。
    pub const NIL: Self = Self::from_fields(0, 0, 0, [0; 8]);

    /// 由四个字段构造。
    #[must_use]
    pub const fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// 从 Windows 混合字节序的 16 字节还原。
    #[must_use]
    pub fn from_bytes_le(raw: &[u8; GUID_LEN]) -> Self {
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&raw[8..]);
        Self {
            data1: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            data2: u16::from_le_bytes([raw[4], raw[5]]),
            data3: u16::from_le_bytes([raw[6], raw[7]]),
            data4,
        }
    }

    /// 输出 Windows 混合字节序的 16 字节。
    #[must_use]
    pub fn to_bytes_le(&self) -> [u8; GUID_LEN] {
        let mut raw = [0u8; GUID_LEN];
        raw[0..4].copy_from_slice(&self.data1.to_le_bytes());
        raw[4..6].copy_from_slice(&self.data2.to_le_bytes());
        raw[6..8].copy_from_slice(&self.data3.to_le_bytes());
        raw[8..].copy_from_slice(&self.data4);
        raw
    }

    /// 是否为全零 GUID。
    #[must_use]
    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }

    /// 解析 `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` 形式，大小写均可。
    pub fn parse(text: &str) -> Result<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != TEXT_LEN || HYPHENS.iter().any(|at| bytes[*at] != b'-') {
            return Err(SddlError::entry("GUID 文本必须为 8-4-4-4-12 形式", 0));
        }

        let mut packed = [0u8; GUID_LEN];
        let groups: [(usize, usize, usize); 5] =
            [(0, 8, 0), (9, 13, 4), (14, 18, 6), (19, 23, 8), (24, 36, 10)];
        for (start, end, at) in groups {
            let width = (end - start) / 2;
            hex::decode_to_slice(&bytes[start..end], &mut packed[at..at + width])
                .map_err(|_| SddlError::entry("GUID 含有非十六进制字符", start))?;
        }

        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&packed[8..]);
        Ok(Self {
            data1: u32::from_be_bytes([packed[0], packed[1], packed[2], packed[3]]),
            data2: u16::from_be_bytes([packed[4], packed[5]]),
            data3: u16::from_be_bytes([packed[6], packed[7]]),
            data4,
        })
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

impl FromStr for Guid {
    type Err = SddlError;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    const USER_FORCE_CHANGE_PASSWORD: &str = "00299570-246d-11d0-a768-00aa006e0529";

    #[test]
    fn text_and_binary_agree_with_windows_layout() {
        let guid: Guid = USER_FORCE_CHANGE_PASSWORD.parse().expect("GUID 应可解析");
        assert_eq!(
            guid.to_bytes_le(),
            [
                0x70, 0x95, 0x29, 0x00, 0x6d, 0x24, 0xd0, 0x11, 0xa7, 0x68, 0x00, 0xaa, 0x00,
                0x6e, 0x05, 0x29
            ]
        );
        assert_eq!(Guid::from_bytes_le(&guid.to_bytes_le()), guid);
        assert_eq!(guid.to_string(), USER_FORCE_CHANGE_PASSWORD);
    }

    #[test]
    fn uppercase_input_renders_lowercase() {
        let guid = Guid::parse("BF967ABA-0DE6-11D0-A285-00AA003049E2").expect("大写输入合法");
        assert_eq!(guid.to_string(), "bf967aba-0de6-11d0-a285-00aa003049e2");
    }

    #[test]
    fn malformed_text_is_rejected() {
        assert!(Guid::parse("").is_err());
        assert!(Guid::parse("bf967aba0de611d0a28500aa003049e2").is_err());
        assert!(Guid::parse("bf967aba-0de6-11d0-a285-00aa003049eg").is_err());
        assert!(Guid::parse("{bf967aba-0de6-11d0-a285-00aa003049e2}").is_err());
        assert!(Guid::NIL.is_nil());
    }
}
