use chrono::{DateTime, Utc};
use colored::*;
use lib_parksync::realtime::{LoggedNotification, OccupancyView, age_label, badge_label};
use lib_parksync::{ConnectionState, NotificationEvent, SpotStatus};

pub fn connection_line(state: ConnectionState) -> String {
    match state {
        ConnectionState::Open => format!("{} live", "●".green()),
        ConnectionState::Connecting => format!("{} connecting", "◌".yellow()),
        ConnectionState::Closed => format!("{} offline, showing last known state", "○".red()),
    }
}

pub fn occupancy_table(view: &OccupancyView) -> String {
    let mut lines = vec![format!(
        "{}/{} occupied, {} free",
        view.occupied_count(),
        view.spots().len(),
        view.free_count()
    )];
    for (name, status) in view.spots() {
        lines.push(spot_line(name, status));
    }
    lines.join("\n")
}

pub fn spot_line(name: &str, status: &SpotStatus) -> String {
    let state = if status.violation {
        "VIOLATION".red().bold()
    } else if status.reserved {
        "reserved".blue()
    } else if status.occupied {
        "occupied".yellow()
    } else {
        "free".green()
    };

    let mut line = format!("  {:<6} {}", name, state);
    if let Some(plate) = &status.plate {
        match status.plate_conf {
            Some(conf) => line.push_str(&format!("  plate {} ({:.0}%)", plate, conf * 100.0)),
            None => line.push_str(&format!("  plate {}", plate)),
        }
    }
    if let Some(reservation) = &status.reservation {
        if let Some(plate) = &reservation.plate {
            line.push_str(&format!("  for {}", plate));
        }
        if let Some(until) = reservation.expires_at_utc() {
            line.push_str(&format!(" until {}", until.format("%H:%M")));
        }
    }
    if let Some(prob) = status.prob {
        line.push_str(&format!("  p={:.2}", prob).dimmed().to_string());
    }
    line
}

pub fn alert_line(event: &NotificationEvent) -> String {
    let headline = format!("{} {}", event.category.icon(), event.title);
    let headline = if event.category.is_alertable() {
        headline.red().bold()
    } else {
        headline.cyan()
    };
    if event.body.is_empty() {
        headline.to_string()
    } else {
        format!("{}: {}", headline, event.body)
    }
}

pub fn inbox_header(unread: usize) -> String {
    match badge_label(unread) {
        Some(badge) => format!("Inbox [{}]", badge.bold()),
        None => "Inbox".to_string(),
    }
}

pub fn inbox_line(entry: &LoggedNotification, now: DateTime<Utc>) -> String {
    let marker = if entry.read { " ".normal() } else { "•".blue() };
    let id = match entry.server_id {
        Some(server_id) => format!("#{}", server_id),
        None => format!("~{}", entry.id),
    };
    format!(
        "{} {:>5} {} {} - {} ({})",
        marker,
        id,
        entry.category.icon(),
        entry.title,
        entry.body,
        age_label(entry.created_at, now).dimmed()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_parksync::NotificationCategory;
    use lib_parksync::realtime::Reservation;

    #[test]
    fn test_spot_line_details() {
        let status = SpotStatus {
            occupied: true,
            plate: Some("KLM-4".to_string()),
            plate_conf: Some(0.87),
            prob: Some(0.93),
            ..Default::default()
        };
        let line = spot_line("A1", &status);
        assert!(line.contains("A1"));
        assert!(line.contains("occupied"));
        assert!(line.contains("plate KLM-4 (87%)"));
        assert!(line.contains("p=0.93"));

        let reserved = SpotStatus {
            reserved: true,
            reservation: Some(Reservation {
                expires_at: Some(0.0),
                plate: Some("RES-1".to_string()),
            }),
            ..Default::default()
        };
        let line = spot_line("B2", &reserved);
        assert!(line.contains("reserved"));
        assert!(line.contains("for RES-1 until 00:00"));
    }

    #[test]
    fn test_alert_and_inbox_lines() {
        let event = NotificationEvent {
            title: "Unauthorized vehicle".to_string(),
            body: "XYZ in A2".to_string(),
            category: NotificationCategory::ViolationAlert,
            ..Default::default()
        };
        let line = alert_line(&event);
        assert!(line.contains("Unauthorized vehicle"));
        assert!(line.contains("XYZ in A2"));

        let now = Utc::now();
        let mut entry = LoggedNotification::from_event(event, true, now - chrono::Duration::minutes(5));
        entry.server_id = Some(12);
        let line = inbox_line(&entry, now);
        assert!(line.contains("#12"));
        assert!(line.contains("5m"));

        assert_eq!(inbox_header(0), "Inbox");
        assert!(inbox_header(120).contains("99+"));
    }

    #[test]
    fn test_occupancy_summary() {
        let mut view = OccupancyView::new();
        let mut spots = lib_parksync::SpotMap::new();
        spots.insert("A1".to_string(), SpotStatus { occupied: true, ..Default::default() });
        spots.insert("A2".to_string(), SpotStatus::default());
        view.apply(spots);

        let table = occupancy_table(&view);
        assert!(table.starts_with("1/2 occupied, 1 free"));
        assert_eq!(table.lines().count(), 3);
    }
}
