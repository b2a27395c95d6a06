use super::*;

struct Upper;

impl Converter for Upper {
    fn decode(&self, node: &Value) -> Result<Value, String> {
        Ok(Value::from(node.as_str().unwrap_or_default().to_uppercase()))
    }

    fn encode(&self, value: &Value) -> Result<Value, String> {
        Ok(value.clone())
    }
}

#[test]
fn test_parse_duration_units() {
    assert_eq!(parse_duration_ms("250ms").unwrap(), 250);
    assert_eq!(parse_duration_ms("45s").unwrap(), 45_000);
    assert_eq!(parse_duration_ms("1h 30m").unwrap(), 5_400_000);
    assert_eq!(parse_duration_ms("1h30m").unwrap(), 5_400_000);
    assert_eq!(parse_duration_ms("2d").unwrap(), 172_800_000);
    assert_eq!(parse_duration_ms("90").unwrap(), 90_000);
}

#[test]
fn test_parse_duration_rejects_garbage() {
    assert!(parse_duration_ms("").is_err());
    assert!(parse_duration_ms("fast").is_err());
    assert!(parse_duration_ms("10 parsecs").is_err());
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration_ms(0), "0s");
    assert_eq!(format_duration_ms(5_400_000), "1h 30m");
    assert_eq!(format_duration_ms(1_250), "1s 250ms");
    assert_eq!(
        parse_duration_ms(&format_duration_ms(93_784_005)).unwrap(),
        93_784_005
    );
}

#[test]
fn test_duration_converter_accepts_numbers_and_strings() {
    let c = DurationConverter;
    assert_eq!(c.decode(&Value::from("2m")).unwrap(), Value::from(120_000u64));
    assert_eq!(c.decode(&Value::from(500)).unwrap(), Value::from(500));
    assert!(c.decode(&Value::Bool(true)).is_err());
    assert_eq!(c.encode(&Value::from(120_000u64)).unwrap(), Value::from("2m"));
}

#[test]
fn test_level_converter_normalizes() {
    let c = LevelConverter;
    assert_eq!(c.decode(&Value::from("WARNING")).unwrap(), Value::from("warn"));
    assert!(c.decode(&Value::from("loud")).is_err());
}

#[test]
fn test_later_registration_shadows_earlier() {
    let base = SerializerRegistry::defaults();
    let mut overlay = SerializerRegistry::new();
    overlay.register(LEVEL, Upper);

    let composed = SerializerRegistry::compose(&base, &overlay);
    assert_eq!(composed.len(), 3);
    let level = composed.get(LEVEL).unwrap();
    assert_eq!(level.decode(&Value::from("info")).unwrap(), Value::from("INFO"));

    // the base registry is untouched
    let original = base.get(LEVEL).unwrap();
    assert_eq!(original.decode(&Value::from("INFO")).unwrap(), Value::from("info"));
}

#[test]
fn test_get_unknown_type() {
    let registry = SerializerRegistry::defaults();
    assert!(registry.get("colour").is_none());
    assert!(registry.contains(DURATION));
}
