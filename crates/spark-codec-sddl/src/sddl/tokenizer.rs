//! SDDL 文本切分工具。
//!
//! 只做“形状”层面的切分，不解释记号含义：
//! - [`scan_tokens`]：把无分隔的记号串（如 `CIOIIO`）按最长匹配拆成表项；
//! - [`split_entries`]：把 `(…)(…)` 拆成括号内的条目文本；
//! - [`split_sections`]：在括号外定位 `O:`/`G:`/`D:`/`S:` 节前缀。

use alloc::vec::Vec;

use crate::error::{Result, SddlError};

/// 按最长匹配把 `text` 拆成表中的记号；空串得到空列表，遇到无法识别的位置返回 `None`。
pub(crate) fn scan_tokens<T: Copy>(text: &str, table: &[(&'static str, T)]) -> Option<Vec<T>> {
    let mut values = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let (token, value) = table
            .iter()
            .filter(|(token, _)| rest.starts_with(token))
            .max_by_key(|(token, _)| token.len())?;
        values.push(*value);
        rest = &rest[token.len()..];
    }
    Some(values)
}

/// 拆分 `(tok)(tok)…`；每个条目文本非空且不含括号，外层形状不匹配时返回 `MalformedList`。
pub(crate) fn split_entries(body: &str) -> Result<Vec<&str>> {
    let mut entries = Vec::new();
    let mut rest = body;
    let mut position = 0;
    while !rest.is_empty() {
        let inner = rest
            .strip_prefix('(')
            .ok_or(SddlError::list("条目必须以 `(` 开始", position))?;
        let close = inner
            .find(')')
            .ok_or(SddlError::list("条目缺少 `)`", position))?;
        let token = &inner[..close];
        if token.is_empty() || token.contains('(') {
            return Err(SddlError::list("条目文本为空或含有嵌套括号", position));
        }
        entries.push(token);
        position += close + 2;
        rest = &inner[close + 1..];
    }
    Ok(entries)
}

/// 描述符文本中的四个节；`None` 表示该节未出现。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SectionTexts<'a> {
    pub owner: Option<&'a str>,
    pub group: Option<&'a str>,
    pub dacl: Option<&'a str>,
    pub sacl: Option<&'a str>,
}

/// 在括号外寻找 `X:` 形式的节前缀并切分。
///
/// 节可以任意顺序出现，但每节至多一次；前缀之前不允许出现其他文本。
pub(crate) fn split_sections(text: &str) -> Result<SectionTexts<'_>> {
    let bytes = text.as_bytes();
    let mut markers: Vec<(u8, usize)> = Vec::new();
    let mut depth = 0usize;
    for (index, byte) in bytes.iter().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(SddlError::descriptor("括号不匹配", index))?;
            }
            b':' if depth == 0 => {
                let letter = index
                    .checked_sub(1)
                    .map(|at| bytes[at])
                    .filter(u8::is_ascii_alphabetic)
                    .ok_or(SddlError::descriptor("节前缀缺少字母", index))?;
                markers.push((letter, index - 1));
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(SddlError::descriptor("括号不匹配", text.len()));
    }

    let mut sections = SectionTexts::default();
    match markers.first() {
        None if text.is_empty() => return Ok(sections),
        Some((_, 0)) => {}
        _ => return Err(SddlError::descriptor("描述符文本必须以节前缀开始", 0)),
    }

    for (index, &(letter, start)) in markers.iter().enumerate() {
        let end = markers.get(index + 1).map_or(text.len(), |(_, next)| *next);
        if end < start + 2 {
            return Err(SddlError::descriptor("节前缀重叠", start));
        }
        let content = &text[start + 2..end];
        let slot = match letter {
            b'O' => &mut sections.owner,
            b'G' => &mut sections.group,
            b'D' => &mut sections.dacl,
            b'S' => &mut sections.sacl,
            _ => return Err(SddlError::descriptor("未知的节前缀", start)),
        };
        if slot.replace(content).is_some() {
            return Err(SddlError::descriptor("节重复出现", start));
        }
    }
    Ok(sections)
}
