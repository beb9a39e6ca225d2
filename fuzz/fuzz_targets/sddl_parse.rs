#![no_main]

use libfuzzer_sys::fuzz_target;
use spark_codec_sddl::{Sections, SecurityDescriptor};

// 解析成功的文本渲染后必须能再次解析，且二次渲染结果不变。
fuzz_target!(|text: &str| {
    let Ok(descriptor) = SecurityDescriptor::from_sddl(text) else {
        return;
    };
    let Ok(first) = descriptor.to_sddl(Sections::ALL) else {
        return;
    };
    match SecurityDescriptor::from_sddl(&first) {
        Ok(reparsed) => assert_eq!(reparsed.to_sddl(Sections::ALL).ok().as_deref(), Some(first.as_str())),
        Err(err) => panic!("渲染结果无法解析：{first} ({err})"),
    }
});
