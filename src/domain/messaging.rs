//! Message and notification states

string_enum! {
    pub enum MessageStatus {
        Sent => "sent",
        Delivered => "delivered",
        Read => "read",
        Archived => "archived",
    }
}

string_enum! {
    pub enum NotificationType {
        Reservation => "reservation",
        Payment => "payment",
        Message => "message",
        Review => "review",
        System => "system",
        Promotion => "promotion",
    }
}

string_enum! {
    pub enum NotificationStatus {
        Unread => "unread",
        Read => "read",
        Archived => "archived",
    }
}

pub const PREVIEW_LEN: usize = 100;

/// First 100 characters of a message, with an ellipsis when cut.
pub fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_LEN {
        let head: String = content.chars().take(PREVIEW_LEN).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previews_cut_at_one_hundred_chars() {
        let long = "é".repeat(120);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 103);
        assert!(p.ends_with("..."));
        assert_eq!(preview("hello"), "hello");
    }
}
