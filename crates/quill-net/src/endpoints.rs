//! Node API paths, relative to the transport's API base.

/// Submit a sealed trx envelope.
pub fn post_trx(group_id: &str) -> String {
    format!("/node/trx/{group_id}")
}

/// Page through a group's content with a sealed request.
pub fn group_content(group_id: &str) -> String {
    format!("/node/groupctn/{group_id}")
}

/// Query chain metadata (group info, auth lists, app config, producers).
pub fn chain_data(group_id: &str) -> String {
    format!("/node/getchaindata/{group_id}")
}

/// Fetch one trx in its sealed form.
pub fn trx(group_id: &str, trx_id: &str) -> String {
    format!("/trx/{group_id}/{trx_id}")
}
