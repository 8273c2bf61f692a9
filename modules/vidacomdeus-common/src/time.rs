use chrono::{DateTime, SecondsFormat, Utc};

/// Current UTC time as RFC 3339 with a `Z` suffix, second precision.
pub fn now_iso() -> String {
    to_iso(Utc::now())
}

pub fn to_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_with_z_suffix() {
        let ts = Utc.with_ymd_and_hms(2026, 2, 21, 9, 42, 0).unwrap();
        assert_eq!(to_iso(ts), "2026-02-21T09:42:00Z");
    }

    #[test]
    fn now_is_parseable() {
        let now = now_iso();
        assert!(now.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&now).is_ok());
    }
}
