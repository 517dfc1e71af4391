use chrono::{DateTime, Duration, SubsecRound, Utc};
use uuid::Uuid;

use depot_core::{BlobKey, DateRange, FileId, FileRecord, OwnerId, SearchFilter};

use crate::error::MetadataError;
use crate::store::MetadataStore;

/// Build a record suitable for conformance tests.
///
/// Timestamps are truncated to microseconds so backends with that precision
/// round-trip records exactly.
#[must_use]
pub fn sample_record(owner: OwnerId, name: &str, content_type: &str) -> FileRecord {
    let id = FileId::generate();
    let now = Utc::now().trunc_subsecs(6);
    FileRecord {
        id,
        owner,
        name: name.to_owned(),
        size_bytes: 1024,
        content_type: content_type.to_owned(),
        blob_key: BlobKey::for_file(&id),
        public_url: None,
        is_public: false,
        expires_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn new_owner() -> OwnerId {
    OwnerId::from(Uuid::new_v4())
}

fn at(offset: Duration) -> DateTime<Utc> {
    (Utc::now() + offset).trunc_subsecs(6)
}

/// Run the full metadata store conformance test suite.
///
/// Every test uses fresh owners and ids, so the suite can run against a
/// shared database.
///
/// # Errors
///
/// Returns an error if any backend call fails unexpectedly.
pub async fn run_metadata_conformance_tests(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    test_find_missing(store).await?;
    test_create_and_find(store).await?;
    test_create_duplicate(store).await?;
    test_find_by_owner(store).await?;
    test_find_filtered(store).await?;
    test_find_expired(store).await?;
    test_update(store).await?;
    test_delete(store).await?;
    Ok(())
}

async fn test_find_missing(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let found = store.find_by_id(&FileId::generate()).await?;
    assert!(found.is_none(), "find_by_id on missing id should return None");
    Ok(())
}

async fn test_create_and_find(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let mut record = sample_record(new_owner(), "report.pdf", "application/pdf");
    record.expires_at = Some(at(Duration::days(7)));
    store.create(&record).await?;
    let found = store.find_by_id(&record.id).await?;
    assert_eq!(found.as_ref(), Some(&record), "record should round-trip");
    Ok(())
}

async fn test_create_duplicate(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let record = sample_record(new_owner(), "dup.txt", "text/plain");
    store.create(&record).await?;
    let result = store.create(&record).await;
    assert!(
        matches!(result, Err(MetadataError::Conflict(id)) if id == record.id),
        "second create with same id should conflict"
    );
    Ok(())
}

async fn test_find_by_owner(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let owner = new_owner();
    let mut first = sample_record(owner, "a.txt", "text/plain");
    first.created_at = at(Duration::seconds(-2));
    let second = sample_record(owner, "b.txt", "text/plain");
    let other = sample_record(new_owner(), "c.txt", "text/plain");
    store.create(&first).await?;
    store.create(&second).await?;
    store.create(&other).await?;

    let found = store.find_by_owner(&owner).await?;
    let ids: Vec<FileId> = found.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![first.id, second.id], "only the owner's files, in order");

    let none = store.find_by_owner(&new_owner()).await?;
    assert!(none.is_empty());
    Ok(())
}

async fn test_find_filtered(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let owner = new_owner();
    let mut report = sample_record(owner, "Quarterly_Report.pdf", "application/pdf");
    report.created_at = at(Duration::days(-10));
    let invoice = sample_record(owner, "invoice.txt", "text/plain");
    let foreign = sample_record(new_owner(), "report.pdf", "application/pdf");
    store.create(&report).await?;
    store.create(&invoice).await?;
    store.create(&foreign).await?;

    let by_name = store
        .find_filtered(&owner, &SearchFilter::default().with_name("rep"))
        .await?;
    assert_eq!(by_name.len(), 1, "name filter is a case-insensitive substring");
    assert_eq!(by_name[0].id, report.id);

    let by_type = store
        .find_filtered(&owner, &SearchFilter::default().with_content_type("text/plain"))
        .await?;
    assert_eq!(by_type.len(), 1);
    assert_eq!(by_type[0].id, invoice.id);

    let recent = DateRange {
        start: Some(at(Duration::days(-1))),
        end: None,
    };
    let by_date = store
        .find_filtered(&owner, &SearchFilter::default().with_created(recent))
        .await?;
    assert_eq!(by_date.len(), 1);
    assert_eq!(by_date[0].id, invoice.id);

    let none = store
        .find_filtered(
            &owner,
            &SearchFilter::default()
                .with_name("rep")
                .with_content_type("text/plain"),
        )
        .await?;
    assert!(none.is_empty(), "filters are conjunctive");

    let all = store.find_filtered(&owner, &SearchFilter::default()).await?;
    assert_eq!(all.len(), 2, "empty filter returns every owned file");

    let wildcard = store
        .find_filtered(&owner, &SearchFilter::default().with_name("%"))
        .await?;
    assert!(wildcard.is_empty(), "name filter is literal, not a pattern");
    Ok(())
}

async fn test_find_expired(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let owner = new_owner();
    let mut expired = sample_record(owner, "old.txt", "text/plain");
    expired.expires_at = Some(at(Duration::hours(-1)));
    let mut future = sample_record(owner, "new.txt", "text/plain");
    future.expires_at = Some(at(Duration::hours(1)));
    let forever = sample_record(owner, "forever.txt", "text/plain");
    store.create(&expired).await?;
    store.create(&future).await?;
    store.create(&forever).await?;

    let found = store.find_expired(Utc::now()).await?;
    assert!(found.iter().any(|r| r.id == expired.id));
    assert!(!found.iter().any(|r| r.id == future.id));
    assert!(!found.iter().any(|r| r.id == forever.id));
    Ok(())
}

async fn test_update(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let mut record = sample_record(new_owner(), "share-me.txt", "text/plain");
    store.create(&record).await?;

    record.is_public = true;
    record.public_url = Some(format!("https://files.example.com/{}", record.id));
    record.expires_at = Some(at(Duration::days(1)));
    record.updated_at = at(Duration::seconds(1));
    store.update(&record).await?;

    let found = store.find_by_id(&record.id).await?;
    assert_eq!(found.as_ref(), Some(&record), "update should persist all fields");

    let missing = sample_record(new_owner(), "ghost.txt", "text/plain");
    let result = store.update(&missing).await;
    assert!(
        matches!(result, Err(MetadataError::NotFound(id)) if id == missing.id),
        "update of a missing record should fail with NotFound"
    );
    Ok(())
}

async fn test_delete(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let record = sample_record(new_owner(), "bye.txt", "text/plain");
    store.create(&record).await?;
    assert!(store.delete(&record.id).await?, "delete should return true");
    assert!(store.find_by_id(&record.id).await?.is_none());
    assert!(
        !store.delete(&record.id).await?,
        "delete on missing record should return false"
    );
    Ok(())
}
