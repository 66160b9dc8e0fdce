pub mod tests {
    use crate::{BucketSpec, Destination};

    pub const TEST_MANAGED_HOST: &str = "storage.test.local";
    pub const TEST_ASSETS_BUCKET: &str = "site-assets";

    pub fn test_bucket_specs() -> Vec<BucketSpec> {
        vec![
            BucketSpec::new(
                TEST_ASSETS_BUCKET,
                true,
                10 * 1024 * 1024,
                &["image/jpeg", "image/png", "image/webp"],
            ),
            BucketSpec::new(
                "destination-images",
                true,
                5 * 1024 * 1024,
                &["image/jpeg", "image/png", "image/webp"],
            ),
            BucketSpec::new("documents", false, 20 * 1024 * 1024, &["application/pdf"]),
        ]
    }

    pub fn unmigrated_destination(id: i64, slug: &str, source_url: &str) -> Destination {
        Destination {
            id,
            slug: slug.to_string(),
            hero_image_url: Some(source_url.to_string()),
            managed_hero_url: None,
        }
    }

    pub fn migrated_destination(id: i64, slug: &str, managed_url: &str) -> Destination {
        Destination {
            id,
            slug: slug.to_string(),
            hero_image_url: Some(format!("https://legacy.example.com/{}.jpg", slug)),
            managed_hero_url: Some(managed_url.to_string()),
        }
    }
}
