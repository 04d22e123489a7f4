//! Context-window parser for the pnputil device listing.
//!
//! The utility emits each device as a fixed block: three header-area
//! lines (instance ID, description, class name), a class-GUID line, then
//! three lines with provider, status and driver name, followed by a
//! blank separator. The parser seeks GUID marker lines and binds the
//! surrounding window positionally; the label text before the colon is
//! locale-dependent and ignored.

use super::{HidDevice, HidError};

/// Banner lines preceding the first device block.
pub(crate) const HEADER_LINES: usize = 2;
/// Field lines captured before each marker line.
pub(crate) const PRE_CONTEXT: usize = 3;
/// Lines captured after each marker line (three fields plus the blank
/// separator, which is tolerated missing at the end of output).
pub(crate) const POST_CONTEXT: usize = 4;
/// Post-context lines that carry fields.
const POST_FIELDS: usize = 3;

/// Parse a captured `/enum-devices` listing into raw (not yet
/// codepage-repaired) device records, in emission order.
///
/// Zero marker matches is an empty listing, not an error. A marker whose
/// window is shorter than the fixed block format is a
/// [`HidError::ParseInconsistency`]: the output format changed and every
/// positional binding would be suspect, so the whole enumeration is
/// rejected rather than misparsed.
pub(crate) fn parse_device_listing(lines: &[String]) -> Result<Vec<HidDevice>, HidError> {
    let body = lines.get(HEADER_LINES..).unwrap_or(&[]);
    let mut devices = Vec::new();
    for (idx, line) in body.iter().enumerate() {
        if !is_guid_marker(line) {
            continue;
        }
        devices.push(bind_window(body, idx)?);
    }
    Ok(devices)
}

/// A marker line contains `GUID` followed, later on the line, by a
/// colon. This covers both `Class GUID:` and localized labels such as
/// `GUID класса:`.
fn is_guid_marker(line: &str) -> bool {
    match line.find("GUID") {
        Some(pos) => line[pos + "GUID".len()..].contains(':'),
        None => false,
    }
}

/// Capture the window around the marker at `body[marker]` and bind it
/// positionally to the seven record fields.
fn bind_window(body: &[String], marker: usize) -> Result<HidDevice, HidError> {
    let truncated = |missing: String| HidError::ParseInconsistency {
        // 1-based line number in the raw output, banner included.
        line: HEADER_LINES + marker + 1,
        missing,
    };

    if marker < PRE_CONTEXT {
        return Err(truncated(format!(
            "only {marker} of {PRE_CONTEXT} pre-context lines"
        )));
    }
    let pre = &body[marker - PRE_CONTEXT..marker];
    let post_end = (marker + 1 + POST_CONTEXT).min(body.len());
    let post = &body[marker + 1..post_end];
    if post.len() < POST_FIELDS {
        return Err(truncated(format!(
            "only {} of {} post-context lines",
            post.len(),
            POST_FIELDS
        )));
    }

    Ok(HidDevice {
        instance_id: strip_label(&pre[0]),
        description: strip_label(&pre[1]),
        class_name: strip_label(&pre[2]),
        class_guid: strip_label(&body[marker]),
        provider_name: strip_label(&post[0]),
        status: strip_label(&post[1]),
        driver_name: strip_label(&post[2]),
    })
}

/// Drop the `<label>:` prefix: everything up to the last colon goes,
/// along with the whitespace that follows it. A line without a colon
/// passes through unchanged.
fn strip_label(line: &str) -> String {
    match line.rfind(':') {
        Some(pos) => line[pos + 1..].trim_start().to_owned(),
        None => line.to_owned(),
    }
}

#[cfg(test)]
mod should {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_owned).collect()
    }

    const COMPLETE_LISTING: &str = r"Microsoft PnP Utility

Instance ID:                USB\VID_0000&PID_0000
Device Description:         Test Device
Class Name:                 HIDClass
Class GUID:                 {745a17a0-74d3-11d0-b6fe-00a0c90f57da}
Provider Name:              Microsoft
Status:                     OK
Driver Name:                hidclass.sys
";

    #[test]
    fn reproduce_all_seven_fields_exactly() {
        let devices = parse_device_listing(&lines(COMPLETE_LISTING)).unwrap();
        assert_eq!(
            devices,
            vec![HidDevice {
                instance_id: r"USB\VID_0000&PID_0000".into(),
                description: "Test Device".into(),
                class_name: "HIDClass".into(),
                class_guid: "{745a17a0-74d3-11d0-b6fe-00a0c90f57da}".into(),
                provider_name: "Microsoft".into(),
                status: "OK".into(),
                driver_name: "hidclass.sys".into(),
            }]
        );
    }

    #[test]
    fn leave_no_label_text_in_any_field() {
        let devices = parse_device_listing(&lines(COMPLETE_LISTING)).unwrap();
        let d = &devices[0];
        for field in [
            &d.instance_id,
            &d.description,
            &d.class_name,
            &d.class_guid,
            &d.provider_name,
            &d.status,
            &d.driver_name,
        ] {
            assert!(!field.contains("Instance ID"), "label left in {field:?}");
            assert!(!field.contains("Name:"), "label left in {field:?}");
        }
    }

    #[test]
    fn match_localized_guid_labels() {
        let listing = r"Microsoft PnP Utility

Instance ID:      USB\VID_0000&PID_0000
Описание устройства:  USB-устройство ввода
Имя класса:       HIDClass
GUID класса:      {745a17a0-74d3-11d0-b6fe-00a0c90f57da}
Изготовитель:     Майкрософт
Состояние:        Запущено
Имя драйвера:     input.inf
";
        let devices = parse_device_listing(&lines(listing)).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].description, "USB-устройство ввода");
        assert_eq!(
            devices[0].class_guid,
            "{745a17a0-74d3-11d0-b6fe-00a0c90f57da}"
        );
        assert_eq!(devices[0].provider_name, "Майкрософт");
    }

    #[test]
    fn return_one_record_per_block() {
        let listing = format!(
            "Microsoft PnP Utility\n\n{block}\n{block}",
            block = "Instance ID: a\nDevice Description: b\nClass Name: c\nClass GUID: {d}\nProvider Name: e\nStatus: f\nDriver Name: g\n"
        );
        let devices = parse_device_listing(&lines(&listing)).unwrap();
        assert_eq!(devices.len(), 2);
        assert!(devices.iter().all(|d| d.class_guid == "{d}"));
    }

    #[test]
    fn return_empty_for_listing_without_markers() {
        let listing = "Microsoft PnP Utility\n\nNo matching devices found.\n";
        assert!(parse_device_listing(&lines(listing)).unwrap().is_empty());
    }

    #[test]
    fn return_empty_for_empty_output() {
        assert!(parse_device_listing(&[]).unwrap().is_empty());
    }

    #[test]
    fn tolerate_missing_trailing_separator() {
        // Last block ends right after the driver line, no blank line.
        let listing = COMPLETE_LISTING.trim_end();
        assert_eq!(parse_device_listing(&lines(listing)).unwrap().len(), 1);
    }

    #[test]
    fn reject_block_missing_post_context() {
        let listing = r"Microsoft PnP Utility

Instance ID:      USB\VID_0000&PID_0000
Device Description:  Test Device
Class Name:       HIDClass
Class GUID:       {745a17a0-74d3-11d0-b6fe-00a0c90f57da}
Provider Name:    Microsoft
";
        let err = parse_device_listing(&lines(listing)).unwrap_err();
        match err {
            HidError::ParseInconsistency { line, ref missing } => {
                assert_eq!(line, 6);
                assert!(missing.contains("post-context"), "{missing}");
            }
            other => panic!("expected ParseInconsistency, got {other:?}"),
        }
    }

    #[test]
    fn reject_block_missing_pre_context() {
        let listing = r"Microsoft PnP Utility

Class Name:       HIDClass
Class GUID:       {745a17a0-74d3-11d0-b6fe-00a0c90f57da}
Provider Name:    Microsoft
Status:           OK
Driver Name:      hidclass.sys
";
        let err = parse_device_listing(&lines(listing)).unwrap_err();
        assert!(matches!(
            err,
            HidError::ParseInconsistency { line: 4, .. }
        ));
    }

    #[test]
    fn strip_greedy_label_prefix() {
        assert_eq!(strip_label("Instance ID:   USB\\VID_0000"), "USB\\VID_0000");
        assert_eq!(strip_label("no colon here"), "no colon here");
        // Greedy: a colon inside the label area goes too.
        assert_eq!(strip_label("Status (extra): note: value"), "value");
        assert_eq!(strip_label("Driver Name:"), "");
    }
}
