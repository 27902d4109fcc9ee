//! Calendar artifacts for a single outage window: an iCalendar document and a
//! Google Calendar "create event" link.
//!
//! Date-times are written as floating local time (`YYYYMMDDTHHMMSS`, no `Z`,
//! no `TZID`) in the fixed +04:00 civil zone.

use crate::core::time_format::{format_long_date, format_time, to_civil};
use crate::domain::model::{CalendarEvent, OutageRecord};
use crate::domain::ports::Clock;
use chrono::{DateTime, Utc};
use url::{form_urlencoded, Url};

pub const PRODID: &str = "-//Power Outages Mauritius//EN";
pub const UID_DOMAIN: &str = "power-outages-mauritius";
pub const DEFAULT_ICS_FILENAME: &str = "power-outage.ics";
pub const GOOGLE_CALENDAR_ENDPOINT: &str = "https://calendar.google.com/calendar/render";

const CRLF: &str = "\r\n";
const MAX_LINE_OCTETS: usize = 75;
const UID_SUFFIX_LEN: usize = 7;

pub fn format_ics_date(instant: &DateTime<Utc>) -> String {
    to_civil(instant).format("%Y%m%dT%H%M%S").to_string()
}

/// TEXT escaping from RFC 5545 §3.3.11.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Splits a content line into 75-octet chunks without cutting a UTF-8 sequence.
/// Continuation lines start with a single space.
fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut folded = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut octets = 0;
    let mut limit = MAX_LINE_OCTETS;
    for c in line.chars() {
        let width = c.len_utf8();
        if octets + width > limit {
            folded.push_str(CRLF);
            folded.push(' ');
            octets = 0;
            // The leading space counts against the continuation line.
            limit = MAX_LINE_OCTETS - 1;
        }
        folded.push(c);
        octets += width;
    }
    folded
}

fn uid_suffix() -> String {
    std::iter::repeat_with(|| fastrand::digit(36))
        .take(UID_SUFFIX_LEN)
        .collect()
}

pub struct CalendarExporter<C: Clock> {
    clock: C,
}

impl<C: Clock> CalendarExporter<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn to_ics(&self, event: &CalendarEvent) -> String {
        let generated_at = self.clock.now();
        let stamp = format_ics_date(&generated_at);
        let uid = format!("{}-{}@{}", stamp, uid_suffix(), UID_DOMAIN);

        let mut lines = vec![
            "BEGIN:VCALENDAR".to_string(),
            "VERSION:2.0".to_string(),
            format!("PRODID:{}", PRODID),
            "CALSCALE:GREGORIAN".to_string(),
            "METHOD:PUBLISH".to_string(),
            "BEGIN:VEVENT".to_string(),
            format!("UID:{}", uid),
            format!("DTSTAMP:{}", stamp),
            format!("DTSTART:{}", format_ics_date(&event.start)),
            format!("DTEND:{}", format_ics_date(&event.end)),
            format!("SUMMARY:{}", escape_text(&event.title)),
            format!("DESCRIPTION:{}", escape_text(&event.description)),
            format!("LOCATION:{}", escape_text(&event.location)),
        ];

        if let Some(raw) = &event.url {
            match Url::parse(raw) {
                Ok(url) => lines.push(format!("URL:{}", url.as_str())),
                Err(e) => tracing::warn!("Omitting invalid event URL {:?}: {}", raw, e),
            }
        }

        lines.push("END:VEVENT".to_string());
        lines.push("END:VCALENDAR".to_string());

        let mut document = String::new();
        for line in lines {
            document.push_str(&fold_line(&line));
            document.push_str(CRLF);
        }
        document
    }
}

/// Google has no URL field, so a reference URL is appended to the details text.
pub fn google_calendar_link(event: &CalendarEvent) -> String {
    let dates = format!(
        "{}/{}",
        format_ics_date(&event.start).replace(['-', ':'], ""),
        format_ics_date(&event.end).replace(['-', ':'], "")
    );
    let details = match &event.url {
        Some(url) => format!("{}\n\nMore info: {}", event.description, url),
        None => event.description.clone(),
    };

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("action", "TEMPLATE")
        .append_pair("text", &event.title)
        .append_pair("dates", &dates)
        .append_pair("details", &details)
        .append_pair("location", &event.location)
        .finish();

    format!("{}?{}", GOOGLE_CALENDAR_ENDPOINT, query)
}

pub fn event_from_record(record: &OutageRecord, url: Option<String>) -> CalendarEvent {
    let description = format!(
        "Scheduled power outage on {} from {} to {}.\nAffected streets: {}",
        format_long_date(&record.start),
        format_time(&record.start),
        format_time(&record.end),
        record.streets
    );

    CalendarEvent {
        title: format!("Power Outage - {}", record.locality),
        description,
        location: format!("{}, {}, Mauritius", record.locality, record.district),
        start: record.start,
        end: record.end,
        url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FixedClock;
    use crate::core::time_format::parse_instant;
    use crate::domain::model::District;

    fn exporter() -> CalendarExporter<FixedClock> {
        CalendarExporter::new(FixedClock::new(parse_instant("2024-05-20T06:30:15Z").unwrap()))
    }

    fn event(url: Option<&str>) -> CalendarEvent {
        CalendarEvent {
            title: "A; B, C".to_string(),
            description: "Line one\nLine two".to_string(),
            location: "Port Louis, Mauritius".to_string(),
            start: parse_instant("2024-06-01T08:00:00+04:00").unwrap(),
            end: parse_instant("2024-06-01T10:00:00+04:00").unwrap(),
            url: url.map(str::to_string),
        }
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text(r"a\b"), r"a\\b");
        assert_eq!(escape_text("a;b,c"), r"a\;b\,c");
        assert_eq!(escape_text("one\r\ntwo\nthree"), r"one\ntwo\nthree");
        assert_eq!(escape_text("plain"), "plain");
    }

    #[test]
    fn test_ics_field_order_and_crlf() {
        let ics = exporter().to_ics(&event(None));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
        assert!(!ics.replace("\r\n", "").contains('\n'));

        let names: Vec<&str> = ics
            .split("\r\n")
            .filter(|l| !l.is_empty())
            .map(|l| l.split(':').next().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "BEGIN", "VERSION", "PRODID", "CALSCALE", "METHOD", "BEGIN", "UID", "DTSTAMP",
                "DTSTART", "DTEND", "SUMMARY", "DESCRIPTION", "LOCATION", "END", "END"
            ]
        );
    }

    #[test]
    fn test_ics_field_values() {
        let ics = exporter().to_ics(&event(Some("https://example.com/outage/1")));
        assert!(ics.contains("\r\nDTSTAMP:20240520T103015\r\n"));
        assert!(ics.contains("\r\nDTSTART:20240601T080000\r\n"));
        assert!(ics.contains("\r\nDTEND:20240601T100000\r\n"));
        assert!(ics.contains("\r\nSUMMARY:A\\; B\\, C\r\n"));
        assert!(ics.contains("\r\nDESCRIPTION:Line one\\nLine two\r\n"));
        assert!(ics.contains("\r\nLOCATION:Port Louis\\, Mauritius\r\n"));
        assert!(ics.contains("\r\nURL:https://example.com/outage/1\r\nEND:VEVENT"));
    }

    #[test]
    fn test_lone_carriage_return_becomes_newline_escape() {
        assert_eq!(escape_text("Old\rMac"), r"Old\nMac");

        let mut event = event(None);
        event.title = "Old\rMac".to_string();
        let ics = exporter().to_ics(&event);
        assert!(ics.contains("\r\nSUMMARY:Old\\nMac\r\n"));
        assert!(!ics.replace("\r\n", "").contains('\r'));
    }

    #[test]
    fn test_url_cannot_add_properties() {
        let ics = exporter().to_ics(&event(Some(
            "https://x.example/a\r\nATTENDEE:mailto:evil@example.com",
        )));
        assert!(!ics.contains("\r\nATTENDEE"));
        assert!(!ics.replace("\r\n", "").contains('\r'));
        let url_lines = ics.split("\r\n").filter(|l| l.starts_with("URL:")).count();
        assert_eq!(url_lines, 1);

        let ics = exporter().to_ics(&event(Some("not a url")));
        assert!(!ics.contains("URL:"));
        assert!(ics.ends_with("END:VEVENT\r\nEND:VCALENDAR\r\n"));
    }

    #[test]
    fn test_uid_is_unique_per_call() {
        let exporter = exporter();
        let uid = |ics: String| {
            ics.split("\r\n")
                .find(|l| l.starts_with("UID:"))
                .unwrap()
                .to_string()
        };
        let first = uid(exporter.to_ics(&event(None)));
        let second = uid(exporter.to_ics(&event(None)));
        assert_ne!(first, second);
        assert!(first.starts_with("UID:20240520T103015-"));
        assert!(first.ends_with("@power-outages-mauritius"));
    }

    #[test]
    fn test_long_lines_are_folded() {
        let mut long = event(None);
        long.description = "Rue Royale, ".repeat(20) + "é".repeat(40).as_str();
        let ics = exporter().to_ics(&long);

        for line in ics.split("\r\n") {
            assert!(line.len() <= 75, "line too long: {line}");
        }

        let unfolded = ics.replace("\r\n ", "");
        let expected = format!("DESCRIPTION:{}", escape_text(&long.description));
        assert!(unfolded.contains(&expected));
    }

    #[test]
    fn test_google_link() {
        let link = google_calendar_link(&event(None));
        assert!(link.starts_with("https://calendar.google.com/calendar/render?action=TEMPLATE&"));
        assert!(link.contains("text=A%3B+B%2C+C"));
        assert!(link.contains("dates=20240601T080000%2F20240601T100000"));
        assert!(link.contains("details=Line+one%0ALine+two"));
        assert!(link.contains("location=Port+Louis%2C+Mauritius"));
        assert!(!link.contains("More+info"));
    }

    #[test]
    fn test_google_link_appends_url_to_details() {
        let link = google_calendar_link(&event(Some("https://example.com/x")));
        assert!(link.contains(
            "details=Line+one%0ALine+two%0A%0AMore+info%3A+https%3A%2F%2Fexample.com%2Fx"
        ));
        assert!(!link.contains("&url="));
    }

    #[test]
    fn test_event_from_record() {
        let record = OutageRecord::new(
            "r1",
            "2024-06-01",
            "Curepipe",
            "Royal Road, Avenue Victoria",
            District::PlainesWilhems,
            parse_instant("2024-06-01T05:00:00Z").unwrap(),
            parse_instant("2024-06-01T08:30:00Z").unwrap(),
        )
        .unwrap();

        let event = event_from_record(&record, None);
        assert_eq!(event.title, "Power Outage - Curepipe");
        assert_eq!(event.location, "Curepipe, Plaines Wilhems, Mauritius");
        assert!(event.description.contains("from 09:00 to 12:30"));
        assert!(event.description.contains("Royal Road, Avenue Victoria"));
        assert_eq!(event.start, record.start);
    }
}
