//! Row to request mapping.
//!
//! Column layout of the spreadsheet template (0-indexed):
//!
//! | Col | Field              | Col | Field              |
//! |-----|--------------------|-----|--------------------|
//! | 0   | `entityIds` (list) | 8   | `alertType`        |
//! | 1   | `publisher`        | 9   | `offer.couponCode` |
//! | 2   | `requiresApproval` | 10  | `offer.redeemOnlineUrl` |
//! | 3   | `text`             | 11  | `offer.termsConditions` |
//! | 4   | `clickthroughUrl`  | 12  | (unused)           |
//! | 5   | `photoUrls` (list) | 13  | `eventInfo.title`  |
//! | 6   | `postDate`         | 14  | `eventInfo.startTime` |
//! | 7   | `topicType`        | 15  | `eventInfo.endTime` |
//!
//! Column 12 is reserved in the template and never read.

use crate::models::{EventInfo, Offer, PostPayload, RawRow, VersionToken};

pub const COL_ENTITY_IDS: usize = 0;
pub const COL_PUBLISHER: usize = 1;
pub const COL_REQUIRES_APPROVAL: usize = 2;
pub const COL_TEXT: usize = 3;
pub const COL_CLICKTHROUGH_URL: usize = 4;
pub const COL_PHOTO_URLS: usize = 5;
pub const COL_POST_DATE: usize = 6;
pub const COL_TOPIC_TYPE: usize = 7;
pub const COL_ALERT_TYPE: usize = 8;
pub const COL_COUPON_CODE: usize = 9;
pub const COL_REDEEM_ONLINE_URL: usize = 10;
pub const COL_TERMS_CONDITIONS: usize = 11;
pub const COL_EVENT_TITLE: usize = 13;
pub const COL_EVENT_START_TIME: usize = 14;
pub const COL_EVENT_END_TIME: usize = 15;

/// Header line of a blank template, in column order.
pub const TEMPLATE_COLUMNS: [&str; 16] = [
    "Entity ID",
    "Publisher",
    "Requires Approval",
    "Text",
    "Clickthrough URL",
    "Photo URL",
    "Post Date",
    "Topic Type",
    "Alert Type",
    "Coupon Code",
    "Redeem Online URL",
    "Terms and Conditions",
    "Reserved",
    "Event Title",
    "Event Start Time",
    "Event End Time",
];

/// Build the request for one row.
///
/// Values pass through verbatim; nothing is validated.
pub fn map(row: &RawRow, api_key: &str, v: &VersionToken) -> PostPayload {
    let field = |index: usize| non_empty(row.cell(index));

    PostPayload {
        api_key: api_key.to_string(),
        v: v.clone(),
        entity_ids: field(COL_ENTITY_IDS).map(|id| vec![id]),
        publisher: field(COL_PUBLISHER),
        requires_approval: field(COL_REQUIRES_APPROVAL),
        text: field(COL_TEXT),
        clickthrough_url: field(COL_CLICKTHROUGH_URL),
        photo_urls: field(COL_PHOTO_URLS).map(|url| vec![url]),
        post_date: field(COL_POST_DATE),
        topic_type: field(COL_TOPIC_TYPE),
        alert_type: field(COL_ALERT_TYPE),
        offer: map_offer(row),
        event_info: map_event_info(row),
    }
}

fn map_offer(row: &RawRow) -> Option<Offer> {
    let offer = Offer {
        coupon_code: non_empty(row.cell(COL_COUPON_CODE)),
        redeem_online_url: non_empty(row.cell(COL_REDEEM_ONLINE_URL)),
        terms_conditions: non_empty(row.cell(COL_TERMS_CONDITIONS)),
    };
    let any = offer.coupon_code.is_some()
        || offer.redeem_online_url.is_some()
        || offer.terms_conditions.is_some();
    any.then_some(offer)
}

fn map_event_info(row: &RawRow) -> Option<EventInfo> {
    let event = EventInfo {
        title: non_empty(row.cell(COL_EVENT_TITLE)),
        start_time: non_empty(row.cell(COL_EVENT_START_TIME)),
        end_time: non_empty(row.cell(COL_EVENT_END_TIME)),
    };
    let any = event.title.is_some() || event.start_time.is_some() || event.end_time.is_some();
    any.then_some(event)
}

fn non_empty(cell: &str) -> Option<String> {
    (!cell.is_empty()).then(|| cell.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn row(line: &str) -> RawRow {
        RawRow::from_cells(line.split(',').map(|c| c.trim().to_string()).collect())
            .expect("16 cells")
    }

    fn version() -> VersionToken {
        VersionToken::from_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn test_basic_row_without_groups() {
        let payload = map(
            &row("e1,pub1,true,hello,http://x,,2024-01-01,topic,alert,,,,,,,"),
            "key",
            &version(),
        );

        assert_eq!(payload.api_key, "key");
        assert_eq!(payload.v.as_str(), "20240101");
        assert_eq!(payload.entity_ids, Some(vec!["e1".to_string()]));
        assert_eq!(payload.photo_urls, None);
        assert!(payload.offer.is_none());
        assert!(payload.event_info.is_none());

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "entityIds": ["e1"],
                "publisher": "pub1",
                "requiresApproval": "true",
                "text": "hello",
                "clickthroughUrl": "http://x",
                "postDate": "2024-01-01",
                "topicType": "topic",
                "alertType": "alert"
            })
        );
    }

    #[test]
    fn test_empty_row_maps_to_empty_body() {
        let payload = map(&row(&",".repeat(15)), "key", &version());
        assert_eq!(serde_json::to_value(&payload).unwrap(), json!({}));
    }

    #[test]
    fn test_list_fields_are_single_element() {
        let payload = map(
            &row("e9,,,,,http://img/1.png,,,,,,,,,,"),
            "key",
            &version(),
        );
        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body["entityIds"], json!(["e9"]));
        assert_eq!(body["photoUrls"], json!(["http://img/1.png"]));
    }

    #[test]
    fn test_partial_offer() {
        let payload = map(&row(",,,,,,,,,,http://redeem,,,,,"), "key", &version());
        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body["offer"], json!({ "redeemOnlineUrl": "http://redeem" }));
        assert!(body.get("eventInfo").is_none());
    }

    #[test]
    fn test_full_event_info() {
        let payload = map(
            &row(",,,,,,,,,,,,,Launch,2024-05-01T10:00,2024-05-01T12:00"),
            "key",
            &version(),
        );
        assert_eq!(
            payload.event_info,
            Some(EventInfo {
                title: Some("Launch".into()),
                start_time: Some("2024-05-01T10:00".into()),
                end_time: Some("2024-05-01T12:00".into()),
            })
        );
        assert!(payload.offer.is_none());
    }

    #[test]
    fn test_reserved_column_is_ignored() {
        let payload = map(&row(",,,,,,,,,,,,RESERVED,,,"), "key", &version());
        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body, json!({}));
    }

    #[test]
    fn test_group_presence_matches_source_columns() {
        // Each offer/event column alone is enough to attach its group
        for col in [9, 10, 11, 13, 14, 15] {
            let mut cells = vec![String::new(); 16];
            cells[col] = "x".into();
            let payload = map(&RawRow::from_cells(cells).unwrap(), "key", &version());

            assert_eq!(payload.offer.is_some(), (9..=11).contains(&col), "col {}", col);
            assert_eq!(payload.event_info.is_some(), (13..=15).contains(&col), "col {}", col);
        }
    }

    #[test]
    fn test_values_pass_through_verbatim() {
        let payload = map(
            &row("e1,,maybe,,not a url,,yesterday,,,,,,,,,"),
            "key",
            &version(),
        );
        assert_eq!(payload.requires_approval.as_deref(), Some("maybe"));
        assert_eq!(payload.clickthrough_url.as_deref(), Some("not a url"));
        assert_eq!(payload.post_date.as_deref(), Some("yesterday"));
    }

    #[test]
    fn test_template_has_one_name_per_column() {
        assert_eq!(TEMPLATE_COLUMNS.len(), crate::models::COLUMN_COUNT);
    }
}
