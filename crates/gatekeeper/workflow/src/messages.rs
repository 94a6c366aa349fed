//! Acknowledgement texts and reviewer notices.

use gatekeeper_types::{Notice, PostSubmission, PublishSubmission, UserId};

pub const POST_STORED: &str = "✅ Info received! Now reply to this with an image.";
pub const POST_DELIVERED: &str = "✅ Sent to the owner!";
pub const PUBLISH_ACCEPTED: &str = "✅ Your item has been submitted for review.";
pub const ALREADY_VERIFIED: &str = "✅ You are already verified.";

pub fn verified(role_name: &str) -> String {
    format!("✅ You are now verified and have been given the **{}** role.", role_name)
}

pub fn post_notice(author: UserId, post: &PostSubmission, image_url: Option<&str>) -> Notice {
    Notice::new(
        format!("New submission from {}:", author.mention()),
        &post.title,
        &post.description,
    )
    .with_image(image_url.map(str::to_string))
}

pub fn publish_notice(author: UserId, item: &PublishSubmission) -> Notice {
    Notice::new(
        format!("New publish submission from {}:", author.mention()),
        &item.item_name,
        &item.description,
    )
    .with_field("Item name", &item.item_name)
    .with_field("Description", &item.description)
    .with_field("Model file", &item.model_file_url)
    .with_field("Texture file", &item.texture_file_url)
}
