use crate::infra::{
    InMemoryProfileDirectory, InMemoryTourRequestStore, LoggingCacheInvalidator,
};
use chrono::{Duration, Local, NaiveDate, Utc};
use clap::Args;
use std::sync::Arc;
use tour_desk::error::AppError;
use tour_desk::workflows::tours::{
    ConfirmationSummary, ContactMethod, DayPeriod, ListingId, SchedulingPolicy, SelectionDraft,
    SelectionError, SubmissionError, TourSchedulingService, TourSubmission, UserId,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for the booking window (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Listing the scripted tour targets
    #[arg(long, default_value = "listing-100")]
    pub(crate) listing: String,
    /// Contact phone submitted with the request
    #[arg(long, default_value = "+15551234567")]
    pub(crate) phone: String,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        listing,
        phone,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());

    println!("Tour scheduling demo");
    println!("Reference date: {today}");

    let store = Arc::new(InMemoryTourRequestStore::default());
    let service = TourSchedulingService::new(
        store,
        Arc::new(InMemoryProfileDirectory::default()),
        Arc::new(LoggingCacheInvalidator),
        SchedulingPolicy::default(),
    );

    let draft = match build_demo_draft(today) {
        Ok(draft) => draft,
        Err(err) => {
            println!("  Draft rejected: {err}");
            return Ok(());
        }
    };
    println!("\nDraft selection");
    for slot in draft.slots_by_priority() {
        println!("- {}. {} at {}", slot.priority, slot.date, slot.time);
    }

    let submission = TourSubmission {
        requester_id: UserId("demo-user".to_string()),
        primary_listing_id: ListingId(listing.clone()),
        additional_listing_ids: Vec::new(),
        selection: draft,
        contact_phone: phone,
        contact_country_code: "+1".to_string(),
        contact_method: ContactMethod::Both,
        notes: Some("Meet at the leasing office".to_string()),
    };

    let receipt = match service.submit(&submission, Utc::now()) {
        Ok(receipt) => receipt,
        Err(err) => {
            println!("  Submission rejected: {err}");
            return Ok(());
        }
    };
    render_confirmation(&receipt.summary);

    println!("\nDuplicate guard");
    match service.submit(&submission, Utc::now()) {
        Err(SubmissionError::DuplicateRequest(existing)) => {
            println!(
                "- Second submission for {} blocked (existing request {} from {})",
                listing,
                existing.request_id.0,
                existing.requested_on.format("%Y-%m-%d")
            );
        }
        Ok(_) => println!("- Unexpected: duplicate submission was accepted"),
        Err(err) => println!("- Submission rejected: {err}"),
    }

    Ok(())
}

/// Two afternoon dates inside the booking window, three ranked slots, with
/// the last-picked slot promoted to the top preference.
fn build_demo_draft(today: NaiveDate) -> Result<SelectionDraft, SelectionError> {
    let first = today + Duration::days(9);
    let second = today + Duration::days(11);

    let mut draft = SelectionDraft::default();
    draft.toggle_date(today, first)?;
    draft.toggle_date(today, second)?;
    draft.set_period(first, DayPeriod::Afternoon)?;
    draft.set_period(second, DayPeriod::Afternoon)?;
    draft.toggle_slot(first, demo_time(13, 0))?;
    draft.toggle_slot(first, demo_time(14, 30))?;
    draft.toggle_slot(second, demo_time(13, 30))?;
    draft.promote_to_top(2)?;
    Ok(draft)
}

fn demo_time(hour: u32, minute: u32) -> chrono::NaiveTime {
    chrono::NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(chrono::NaiveTime::MIN)
}

fn render_confirmation(summary: &ConfirmationSummary) {
    println!("\nConfirmation summary");
    println!(
        "- Request {} for {} ({} listing(s), status {})",
        summary.request_id.0,
        summary.primary_listing_id.0,
        summary.listing_count(),
        summary.status
    );
    println!("- Contact via {}", summary.contact_method);
    if let Some(priority) = &summary.priority_slot {
        println!("- Top preference: {} (rank {})", priority.time, priority.rank);
    }
    for date in &summary.dates {
        println!("- {}", date.date);
        for slot in &date.slots {
            println!("    {}. {}", slot.rank, slot.time);
        }
    }
    println!("- Preferred times: {}", summary.preferred_times_summary);
}
