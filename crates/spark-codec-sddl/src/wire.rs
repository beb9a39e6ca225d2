//! 小端定长字段的有界读取与写出辅助函数。
//!
//! 所有读取函数在越界时返回 `None`，由调用方映射为所在层级的 `Malformed*` 错误；
//! 写出一侧统一采用 “追加到 `Vec<u8>`” 的方式，再由 [`copy_out`] 负责落入调用方缓冲。

use alloc::vec::Vec;

use crate::error::{Result, SddlError};

/// 取出 `[at, at + len)` 区间，越界或溢出时返回 `None`。
#[inline]
pub(crate) fn slice(bytes: &[u8], at: usize, len: usize) -> Option<&[u8]> {
    let end = at.checked_add(len)?;
    bytes.get(at..end)
}

#[inline]
pub(crate) fn read_u8(bytes: &[u8], at: usize) -> Option<u8> {
    bytes.get(at).copied()
}

#[inline]
pub(crate) fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let raw = slice(bytes, at, 2)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}

#[inline]
pub(crate) fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw = slice(bytes, at, 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

#[inline]
pub(crate) fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// 在 `out[at..at + 4]` 处回填 32 位小端值；调用方保证该区间已写入占位字节。
#[inline]
pub(crate) fn patch_u32(out: &mut [u8], at: usize, value: u32) {
    out[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// 将已编码字节复制到调用方缓冲的 `offset` 处，返回写入长度。
pub(crate) fn copy_out(encoded: &[u8], buffer: &mut [u8], offset: usize) -> Result<usize> {
    let available = buffer.len().saturating_sub(offset);
    if encoded.len() > available {
        return Err(SddlError::BufferTooSmall {
            required: encoded.len(),
            available,
        });
    }
    buffer[offset..offset + encoded.len()].copy_from_slice(encoded);
    Ok(encoded.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_bounded() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05];
        assert_eq!(read_u16(&bytes, 0), Some(0x0201));
        assert_eq!(read_u32(&bytes, 1), Some(0x0504_0302));
        assert_eq!(read_u32(&bytes, 2), None);
        assert_eq!(slice(&bytes, usize::MAX, 2), None);
        assert_eq!(read_u8(&bytes, 5), None);
    }

    #[test]
    fn copy_out_reports_shortfall() {
        let mut buffer = [0u8; 6];
        let err = copy_out(&[1, 2, 3, 4], &mut buffer, 4).expect_err("剩余 2 字节不足以写入 4 字节");
        assert_eq!(
            err,
            SddlError::BufferTooSmall {
                required: 4,
                available: 2
            }
        );
        assert_eq!(copy_out(&[9, 9], &mut buffer, 4), Ok(2));
        assert_eq!(buffer, [0, 0, 0, 0, 9, 9]);
    }
}
