#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use spark_codec_sddl::{Acl, SecurityDescriptor};

/// Fuzz 输入：任意字节与起始偏移。
///
/// - **Why**：描述符来自磁盘或网络，解码器必须把任何截断、越界偏移与错误长度都化为错误而不是 panic。
/// - **What**：解码成功时重新编码，再解码必须得到相等的描述符。
#[derive(Debug, Arbitrary)]
struct DecodeCase {
    offset: u8,
    bytes: Vec<u8>,
}

fuzz_target!(|case: DecodeCase| {
    let offset = usize::from(case.offset).min(case.bytes.len());
    let _ = Acl::from_bytes(&case.bytes, offset);

    let Ok(descriptor) = SecurityDescriptor::from_bytes(&case.bytes, offset) else {
        return;
    };
    let encoded = descriptor.to_bytes();
    assert_eq!(encoded.len(), descriptor.binary_len());
    match SecurityDescriptor::from_bytes(&encoded, 0) {
        Ok(again) => assert_eq!(again, descriptor),
        Err(err) => panic!("重新编码的描述符无法解码：{err}"),
    }
});
