use super::*;

#[test]
fn scoped_package_preserves_leading_at() {
    assert_eq!(encode_package_name("@scope/pkg"), "@scope%2Fpkg");
}

#[test]
fn unscoped_package_is_unaffected() {
    assert_eq!(encode_package_name("left-pad"), "left-pad");
}

#[test]
fn round_trips_through_decoding() {
    for name in ["@scope/pkg", "left-pad", "@a/b-c.d_e"] {
        let encoded = encode_package_name(name);
        let without_at = encoded.strip_prefix('@').unwrap_or(&encoded);
        let decoded = urlencoding::decode(without_at).unwrap().into_owned();
        let decoded = if encoded.starts_with('@') {
            format!("@{decoded}")
        } else {
            decoded
        };
        assert_eq!(decoded, name);
    }
}

#[test]
fn scoped_name_does_not_leave_a_literal_percent40() {
    assert!(!encode_package_name("@scope/pkg").starts_with("%40"));
}
