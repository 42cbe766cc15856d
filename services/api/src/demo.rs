use chrono::Utc;
use clap::Args;
use std::sync::Arc;
use swapify::config::MarketplaceConfig;
use swapify::error::AppError;
use swapify::marketplace::{
    CreditPolicy, InMemoryStore, ManualClock, Marketplace, NewUser, Post, PostDraft,
    RecordingNotifier, ReviewDraft, User, UserId,
};

type DemoMarketplace = Marketplace<InMemoryStore, RecordingNotifier>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Who receives exchange credit on completion (counterpart or both).
    #[arg(long, value_parser = crate::infra::parse_credit_policy)]
    pub(crate) credit_policy: Option<CreditPolicy>,
    /// Skip the paid exchange and review portion of the demo.
    #[arg(long)]
    pub(crate) skip_reviews: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        credit_policy,
        skip_reviews,
    } = args;

    let config = MarketplaceConfig {
        exchange_credit: credit_policy.unwrap_or_default(),
        ..MarketplaceConfig::default()
    };
    let notifier = Arc::new(RecordingNotifier::default());
    let market = Marketplace::new(
        Arc::new(InMemoryStore::default()),
        notifier.clone(),
        Arc::new(ManualClock::new(Utc::now())),
        config,
    );

    println!("Swapify marketplace demo");
    let asha = register(&market, "Asha Rao", "asha@example.com", &["Design", "Figma"])?;
    let bina = register(&market, "Bina Shah", "bina@example.com", &["React", "TypeScript"])?;
    let chetan = register(&market, "Chetan Iyer", "chetan@example.com", &["Calculus"])?;

    println!("\nBarter exchange");
    let post = market.lifecycle.create(&asha.id, barter_draft())?;
    print_post("created", &post);
    let post = market.lifecycle.express_interest(
        &post.id,
        &bina.id,
        Some("interested".to_string()),
    )?;
    print_post("interest from Bina", &post);
    let post = market.lifecycle.select_user(&post.id, &asha.id, &bina.id)?;
    print_post("Bina selected", &post);
    println!("  match events published: {}", notifier.events().len());

    if let Err(err) = market
        .lifecycle
        .express_interest(&post.id, &chetan.id, None)
    {
        println!("  late interest from Chetan rejected ({:?}): {err}", err.kind());
    }

    let outcome = market.lifecycle.complete(&post.id, &asha.id)?;
    print_post("completed by Asha", &outcome.post);
    for user in &outcome.credited {
        print_user("credited", user);
    }

    if skip_reviews {
        return Ok(());
    }

    println!("\nPaid exchange with reviews");
    let gig = market.lifecycle.create(&chetan.id, paid_draft())?;
    print_post("created", &gig);
    market.lifecycle.express_interest(&gig.id, &bina.id, None)?;
    market.lifecycle.select_user(&gig.id, &chetan.id, &bina.id)?;
    let outcome = market.lifecycle.complete(&gig.id, &bina.id)?;
    print_post("completed by Bina", &outcome.post);

    for (reviewer, reviewee, post, rating) in [
        (&asha.id, &bina.id, &post, 5),
        (&chetan.id, &bina.id, &outcome.post, 3),
        (&bina.id, &chetan.id, &outcome.post, 4),
    ] {
        let review = market
            .reviews
            .create(reviewer, review_draft(post, reviewee, rating))?;
        println!(
            "  review {} -> {}: {} star(s) on {}",
            review.reviewer, review.reviewee, review.rating, review.post
        );
    }

    if let Err(err) = market
        .reviews
        .create(&asha.id, review_draft(&post, &bina.id, 1))
    {
        println!("  duplicate review rejected ({:?}): {err}", err.kind());
    }

    for id in [&bina.id, &chetan.id] {
        print_user("reputation", &market.identity.user(id)?);
    }
    Ok(())
}

fn register(
    market: &DemoMarketplace,
    name: &str,
    email: &str,
    skills: &[&str],
) -> Result<User, AppError> {
    let user = market.identity.register(NewUser {
        name: name.to_string(),
        email: email.to_string(),
        skills: skills.iter().map(|skill| skill.to_string()).collect(),
        location: "Pune".to_string(),
    })?;
    print_user("registered", &user);
    Ok(user)
}

fn barter_draft() -> PostDraft {
    PostDraft {
        title: "React walkthrough for a logo".to_string(),
        description: "Looking for a React hooks walkthrough; I will design your logo in return."
            .to_string(),
        kind: "barter".to_string(),
        category: "programming".to_string(),
        skills: vec!["React".to_string()],
        location: "Pune".to_string(),
        budget: None,
        offered_skills: Some(vec!["Design".to_string()]),
        images: Vec::new(),
    }
}

fn paid_draft() -> PostDraft {
    PostDraft {
        title: "Landing page build".to_string(),
        description: "Need a responsive landing page for a tutoring business.".to_string(),
        kind: "paid".to_string(),
        category: "programming".to_string(),
        skills: vec!["React".to_string(), "CSS".to_string()],
        location: "Remote".to_string(),
        budget: Some(4000),
        offered_skills: None,
        images: Vec::new(),
    }
}

fn review_draft(post: &Post, reviewee: &UserId, rating: u8) -> ReviewDraft {
    ReviewDraft {
        post: post.id.clone(),
        reviewee: reviewee.clone(),
        rating,
        comment: Some("Thanks for the exchange".to_string()),
        kind: post.kind().label().to_string(),
        categories: None,
        payment_amount: None,
    }
}

fn print_post(step: &str, post: &Post) {
    let selected = post
        .selected_user
        .as_ref()
        .map(|user| user.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  [{}] {} '{}' status={} interested={} selected={}",
        step,
        post.id,
        post.title,
        post.status,
        post.interested_users.len(),
        selected
    );
}

fn print_user(step: &str, user: &User) {
    let badges: Vec<String> = user
        .badges
        .iter()
        .map(|badge| format!("{badge:?}").to_lowercase())
        .collect();
    println!(
        "  [{}] {} ({}) rating={:.1} ratings={} exchanges={} badges=[{}]",
        step,
        user.name,
        user.id,
        user.rating,
        user.total_ratings,
        user.completed_exchanges,
        badges.join(", ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_all_scenarios() {
        run_demo(DemoArgs::default()).expect("demo completes");
    }

    #[test]
    fn demo_supports_both_participant_credit() {
        run_demo(DemoArgs {
            credit_policy: Some(CreditPolicy::BothParticipants),
            skip_reviews: true,
        })
        .expect("demo completes");
    }
}
