// Tables owned by the notification configuration service; read-only here.

diesel::table! {
    notifications (id) {
        id -> Int4,
        customer_id -> Text,
        user_id -> Int4,
        check_id -> Text,
        value -> Text,
        #[sql_name = "type"]
        notification_type -> Text,
    }
}

diesel::table! {
    slack_oauth_responses (id) {
        id -> Int4,
        customer_id -> Text,
        data -> Jsonb,
    }
}

diesel::table! {
    pagerduty_oauth_responses (id) {
        id -> Int4,
        customer_id -> Text,
        data -> Jsonb,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    notifications,
    slack_oauth_responses,
    pagerduty_oauth_responses,
);
