//! 描述符场景回归：SDDL → 二进制 → SDDL 的端到端路径。
//!
//! # 教案式说明
//! - **Why**：单元测试只覆盖单层编解码，这里固定几条跨层路径，确保布局、记号与错误分类在组合后仍然成立。
//! - **What**：参考文本来自 Windows `ConvertStringSecurityDescriptorToSecurityDescriptor` 的输出，渲染结果必须逐字一致。

use spark_codec_sddl::{
    Ace, AceFlags, AceType, ControlFlags, ErrorKind, Guid, Sections, SecurityDescriptor, Sid,
    WellKnownSidKind,
};

const SERVICE_SID: &str = "S-1-5-80-956008885-3418522649-1831038044-1853292631-2271478464";

fn reference_text() -> String {
    format!(
        "O:{SERVICE_SID}G:{SERVICE_SID}D:PAI\
         (A;CIOIIO;0x10000000;;;S-1-3-0)\
         (A;CIOIIO;0x10000000;;;S-1-5-18)\
         (A;;0x1301bf;;;S-1-5-18)\
         (A;CIOIIO;0x10000000;;;S-1-5-32-544)\
         (A;;0x1301bf;;;S-1-5-32-544)\
         (A;CIOIIO;0xa0000000;;;S-1-5-32-545)\
         (A;;0x1200a9;;;S-1-5-32-545)\
         (A;CIIO;0x10000000;;;{SERVICE_SID})\
         (A;;0x1f01ff;;;{SERVICE_SID})\
         (A;;0x1200a9;;;S-1-15-2-1)\
         (A;CIOIIO;0xa0000000;;;S-1-15-2-1)\
         (A;;0x1200a9;;;S-1-15-2-2)\
         (A;CIOIIO;0xa0000000;;;S-1-15-2-2)"
    )
}

#[test]
fn abbreviated_descriptor_has_expected_layout() {
    let descriptor = SecurityDescriptor::from_sddl("O:SYG:SYD:(A;;FA;;;BA)").expect("合法描述符");
    let system = Sid::from_well_known(WellKnownSidKind::LocalSystem, None).expect("固定 SID");
    assert_eq!(descriptor.owner(), Some(&system));
    assert_eq!(descriptor.group(), Some(&system));

    let dacl = descriptor.dacl().expect("存在 DACL");
    assert_eq!(dacl.len(), 1);
    let entry = dacl.get(0).expect("一个条目");
    assert_eq!(entry.ace_type(), Some(AceType::AccessAllowed));
    assert_eq!(entry.flags(), AceFlags::empty());
    assert_eq!(entry.access_mask(), Some(0x001F_01FF));
    assert_eq!(entry.sid().map(ToString::to_string).as_deref(), Some("S-1-5-32-544"));

    let bytes = descriptor.to_bytes();
    assert_eq!(bytes.len(), 20 + 12 + 12 + 8 + 24);
    assert_eq!(&bytes[..4], &[0x01, 0x00, 0x04, 0x80]);
    assert_eq!(&bytes[4..20], &[20, 0, 0, 0, 32, 0, 0, 0, 0, 0, 0, 0, 44, 0, 0, 0]);
    assert_eq!(&bytes[44..52], &[0x02, 0x00, 32, 0, 0x01, 0x00, 0x00, 0x00]);

    let decoded = SecurityDescriptor::from_bytes(&bytes, 0).expect("往返解码");
    assert_eq!(decoded, descriptor);
    assert_eq!(
        decoded.to_sddl(Sections::ALL).expect("可渲染"),
        "O:S-1-5-18G:S-1-5-18D:(A;;0x1f01ff;;;S-1-5-32-544)"
    );
}

#[test]
fn reference_text_renders_verbatim_after_binary_round_trip() {
    let text = reference_text();
    let parsed = SecurityDescriptor::from_sddl(&text).expect("参考文本可解析");
    assert!(parsed.control_flags().contains(ControlFlags::DACL_PROTECTED | ControlFlags::DACL_AUTO_INHERITED));
    assert_eq!(parsed.dacl().map(|acl| acl.len()), Some(13));

    let decoded = SecurityDescriptor::from_bytes(&parsed.to_bytes(), 0).expect("二进制往返");
    assert_eq!(decoded.to_sddl(Sections::ALL).expect("可渲染"), text);
}

#[test]
fn corrupted_list_length_is_a_malformed_list() {
    let mut bytes = SecurityDescriptor::from_sddl("O:SYG:SYD:(A;;FA;;;BA)")
        .expect("合法描述符")
        .to_bytes();
    bytes[46..48].copy_from_slice(&0xFFFFu16.to_le_bytes());
    let err = SecurityDescriptor::from_bytes(&bytes, 0).expect_err("列表长度越界");
    assert_eq!(err.kind(), ErrorKind::MalformedList);
}

#[test]
fn decoding_honours_a_non_zero_offset() {
    let descriptor = SecurityDescriptor::from_sddl("O:BAG:BUD:P(D;OICI;GA;;;AN)").expect("合法描述符");
    let mut buffer = vec![0xEE; 7];
    buffer.extend_from_slice(&descriptor.to_bytes());
    assert_eq!(SecurityDescriptor::from_bytes(&buffer, 7), Ok(descriptor.clone()));

    let mut target = vec![0u8; 7 + descriptor.binary_len()];
    let written = descriptor.write_to(&mut target, 7).expect("缓冲区足够");
    assert_eq!(written, descriptor.binary_len());
    assert_eq!(&target[..7], &[0u8; 7]);
    assert_eq!(&target[7..], &buffer[7..]);
}

#[test]
fn object_entries_round_trip_through_both_forms() {
    let text = "D:(OA;CI;RPWP;bf967a7f-0de6-11d0-a285-00aa003049e2;;AU)(OA;;CR;;4828cc14-1437-45bc-9b07-ad6f015e5f28;BA)";
    let descriptor = SecurityDescriptor::from_sddl(text).expect("对象条目可解析");
    let dacl = descriptor.dacl().expect("存在 DACL");
    assert_eq!(dacl.revision(), spark_codec_sddl::ACL_REVISION_DS);

    let Some(Ace::Object(first)) = dacl.get(0) else {
        panic!("首个条目应为对象条目");
    };
    let expected: Guid = "bf967a7f-0de6-11d0-a285-00aa003049e2".parse().expect("合法 GUID");
    assert_eq!(first.object_type(), Some(expected));
    assert_eq!(first.inherited_object_type(), None);

    let decoded = SecurityDescriptor::from_bytes(&descriptor.to_bytes(), 0).expect("二进制往返");
    assert_eq!(decoded, descriptor);
    assert_eq!(
        decoded.to_sddl(Sections::DACL).expect("可渲染"),
        "D:(OA;CI;0x30;bf967a7f-0de6-11d0-a285-00aa003049e2;;S-1-5-11)\
         (OA;;0x100;;4828cc14-1437-45bc-9b07-ad6f015e5f28;S-1-5-32-544)"
    );
}

#[test]
fn domain_relative_abbreviations_need_context() {
    let err = SecurityDescriptor::from_sddl("O:DA").expect_err("缺少域上下文");
    assert_eq!(err.kind(), ErrorKind::UnsupportedForm);

    let domain: Sid = "S-1-5-21-1004336348-1177238915-682003330".parse().expect("账户域");
    let admins = Sid::from_well_known(WellKnownSidKind::AccountDomainAdmins, Some(&domain))
        .expect("域相对 SID");
    assert_eq!(admins.to_string(), "S-1-5-21-1004336348-1177238915-682003330-512");
}
