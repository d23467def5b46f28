#[cfg(test)]
mod tests {
    use crate::blocks::*;
    use crate::test_support::{date, range, settings, slot};
    use chrono::{TimeZone, Utc};
    use clinicbot_common::services::{EventDraft, RemoteEvent};
    use std::collections::HashMap;

    fn remote(draft: EventDraft, id: &str) -> RemoteEvent {
        RemoteEvent {
            id: id.to_string(),
            summary: Some(draft.summary),
            description: draft.description,
            start: draft.start,
            end: draft.end,
            recurrence: draft.recurrence,
            status: Some("confirmed".to_string()),
            private_properties: draft.private_properties,
        }
    }

    #[test]
    fn test_next_occurrence_includes_today() {
        // 2025-03-05 is a Wednesday
        let wednesday = date("2025-03-05");
        assert_eq!(next_occurrence(DayOfWeek::Wednesday, wednesday), wednesday);
        assert_eq!(next_occurrence(DayOfWeek::Monday, wednesday), date("2025-03-10"));
        assert_eq!(next_occurrence(DayOfWeek::Sunday, wednesday), date("2025-03-09"));
    }

    #[test]
    fn test_weekly_draft_is_anchored_in_clinic_zone() {
        let draft = block_draft(
            BlockScope::Weekly(DayOfWeek::Monday),
            range("09:00", "10:00"),
            &settings(),
            date("2025-03-05"),
        )
        .unwrap();

        // Sao Paulo is UTC-3
        assert_eq!(
            draft.start.date_time,
            Some(Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap())
        );
        assert_eq!(
            draft.end.date_time,
            Some(Utc.with_ymd_and_hms(2025, 3, 10, 13, 0, 0).unwrap())
        );
        assert_eq!(draft.start.time_zone.as_deref(), Some("America/Sao_Paulo"));
        assert_eq!(draft.recurrence, vec!["RRULE:FREQ=WEEKLY;BYDAY=MO".to_string()]);
        assert_eq!(draft.summary, "Horário bloqueado");
        assert_eq!(
            draft.private_properties.get(MARKER_APP_KEY).map(String::as_str),
            Some(MARKER_APP_VALUE)
        );
    }

    #[test]
    fn test_date_draft_has_no_recurrence_and_ends_at_midnight() {
        let draft = block_draft(
            BlockScope::Date(date("2025-04-18")),
            range("23:00", "24:00"),
            &settings(),
            date("2025-03-05"),
        )
        .unwrap();
        assert!(draft.recurrence.is_empty());
        assert_eq!(
            draft.end.date_time,
            Some(Utc.with_ymd_and_hms(2025, 4, 19, 3, 0, 0).unwrap())
        );

        let event = remote(draft, "e1");
        assert_eq!(local_range(&event, settings().time_zone), Some(range("23:00", "24:00")));
        assert_eq!(
            scope_of(&event, settings().time_zone),
            Some(BlockScope::Date(date("2025-04-18")))
        );
    }

    #[test]
    fn test_app_block_detection() {
        let s = settings();
        let draft = block_draft(
            BlockScope::Weekly(DayOfWeek::Friday),
            range("12:00", "13:00"),
            &s,
            date("2025-03-05"),
        )
        .unwrap();
        let event = remote(draft, "e1");
        assert!(is_app_block(&event, &s.summary));
        assert_eq!(
            scope_of(&event, s.time_zone),
            Some(BlockScope::Weekly(DayOfWeek::Friday))
        );

        // description marker alone is enough
        let legacy = RemoteEvent {
            private_properties: HashMap::new(),
            ..event.clone()
        };
        assert!(is_app_block(&legacy, &s.summary));

        // a clinic appointment with the same title is left alone
        let foreign = RemoteEvent {
            description: Some("Consulta".to_string()),
            private_properties: HashMap::new(),
            ..event.clone()
        };
        assert!(!is_app_block(&foreign, &s.summary));

        let renamed = RemoteEvent {
            summary: Some("Almoço".to_string()),
            ..event
        };
        assert!(!is_app_block(&renamed, &s.summary));
    }

    #[test]
    fn test_unaligned_event_has_no_range() {
        let s = settings();
        let mut draft = block_draft(
            BlockScope::Date(date("2025-03-06")),
            range("09:00", "10:00"),
            &s,
            date("2025-03-05"),
        )
        .unwrap();
        draft.end.date_time = draft.end.date_time.map(|t| t + chrono::Duration::minutes(15));
        assert_eq!(local_range(&remote(draft, "e1"), s.time_zone), None);
    }

    #[test]
    fn test_weekly_occurrences_fill_the_window() {
        let s = settings();
        let today = date("2025-03-05");
        let draft = block_draft(
            BlockScope::Weekly(DayOfWeek::Monday),
            range("09:00", "10:00"),
            &s,
            today,
        )
        .unwrap();
        let event = remote(draft, "e1");

        let dates = occurrence_dates(&event, s.time_zone, today, today + chrono::Duration::weeks(12));
        assert_eq!(dates.len(), 12);
        assert_eq!(dates.first(), Some(&date("2025-03-10")));
        assert!(dates.iter().all(|d| chrono::Datelike::weekday(d) == chrono::Weekday::Mon));
    }

    #[test]
    fn test_until_limits_occurrences() {
        let s = settings();
        let today = date("2025-03-05");
        let mut draft = block_draft(
            BlockScope::Weekly(DayOfWeek::Monday),
            range("09:00", "10:00"),
            &s,
            today,
        )
        .unwrap();
        draft.recurrence = vec!["RRULE:FREQ=WEEKLY;BYDAY=MO;UNTIL=20250324T235959Z".to_string()];
        let event = remote(draft, "e1");

        assert_eq!(rrule_until(&event), Some(date("2025-03-24")));
        let dates = occurrence_dates(&event, s.time_zone, today, today + chrono::Duration::weeks(12));
        assert_eq!(dates, vec![date("2025-03-10"), date("2025-03-17"), date("2025-03-24")]);
    }

    #[test]
    fn test_exdate_removes_single_occurrences() {
        let s = settings();
        let today = date("2025-03-05");
        let mut draft = block_draft(
            BlockScope::Weekly(DayOfWeek::Monday),
            range("09:00", "10:00"),
            &s,
            today,
        )
        .unwrap();
        draft.recurrence = vec![
            "RRULE:FREQ=WEEKLY;BYDAY=MO;UNTIL=20250331T235959Z".to_string(),
            "EXDATE;TZID=America/Sao_Paulo:20250317T090000".to_string(),
            "EXDATE:20250324T120000Z".to_string(),
        ];
        let event = remote(draft, "e1");

        assert_eq!(
            excluded_dates(&event, s.time_zone),
            vec![date("2025-03-17"), date("2025-03-24")]
        );
        assert_eq!(scope_of(&event, s.time_zone), Some(BlockScope::Weekly(DayOfWeek::Monday)));
        let dates = occurrence_dates(&event, s.time_zone, today, today + chrono::Duration::weeks(12));
        assert_eq!(dates, vec![date("2025-03-10"), date("2025-03-31")]);
    }

    #[test]
    fn test_weekly_blocks_json_shape() {
        let mut blocks = WeeklyBlocks::default();
        blocks.0.insert(
            DayOfWeek::Monday,
            DayBlocks {
                enabled: true,
                ranges: vec![range("09:00", "10:00")],
            },
        );
        let json = serde_json::to_value(&blocks).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"monday": {"enabled": true, "ranges": [{"from": "09:00", "to": "10:00"}]}})
        );
        assert_eq!(blocks.day(DayOfWeek::Tuesday), DayBlocks::default());
    }

    #[test]
    fn test_disabled_day_wants_nothing() {
        let day = DayBlocks {
            enabled: false,
            ranges: vec![range("09:00", "10:00")],
        };
        assert!(day.desired().is_empty());

        let day = DayBlocks {
            enabled: true,
            ranges: vec![range("09:00", "10:00"), range("10:00", "10:30")],
        };
        assert_eq!(day.desired(), vec![range("09:00", "10:30")]);
        assert_eq!(slot("10:30"), day.desired()[0].to);
    }
}
