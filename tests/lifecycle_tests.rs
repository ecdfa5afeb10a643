mod common;

use common::{Harness, CREATOR};

use proofstake::market::{
    escrow_account, Ineligibility, MarketError, Transition, REASON_INSUFFICIENT_VOTES,
    REASON_MIN_SIDE_STAKE, REASON_NO_PROOF, REASON_TIE,
};
use proofstake::models::{Asset, MarketEvent, MarketStatus, Side, WinningSide};

#[tokio::test]
async fn test_both_sides_meeting_minimum_await_proof() {
    let h = Harness::new();
    let market = h.create_market(100, 1).await;
    h.fund("alice", 1_000, 0);
    h.fund("bob", 1_000, 0);

    market.place_bet("alice", Side::Yes, 150).await.unwrap();
    market.place_bet("bob", Side::No, 120).await.unwrap();

    // Before the deadline the check is a no-op.
    assert_eq!(market.close_betting().await, Ok(Transition::Unchanged));

    h.advance_to(1);
    assert_eq!(
        market.close_betting().await,
        Ok(Transition::Advanced {
            from: MarketStatus::Open,
            to: MarketStatus::AwaitingProof,
        })
    );
    assert_eq!(market.status().await, MarketStatus::AwaitingProof);
}

#[tokio::test]
async fn test_thin_side_cancels_and_refunds_exact_stakes() {
    let h = Harness::new();
    let market = h.create_market(100, 1).await;
    h.fund("alice", 1_000, 0);
    h.fund("bob", 1_000, 0);

    market.place_bet("alice", Side::Yes, 100).await.unwrap();
    market.place_bet("bob", Side::No, 50).await.unwrap();

    h.advance_to(1);
    market.close_betting().await.unwrap();
    assert_eq!(market.status().await, MarketStatus::Cancelled);
    assert_eq!(market.view().await.cancel_reason.as_deref(), Some(REASON_MIN_SIDE_STAKE));

    assert_eq!(market.claim_refund("alice").await, Ok(100));
    assert_eq!(market.claim_refund("bob").await, Ok(50));
    assert_eq!(h.state.registry.get_internal_balances("alice").usd, 1_000);
    assert_eq!(h.state.registry.get_internal_balances("bob").usd, 1_000);
}

#[tokio::test]
async fn test_missing_proof_cancels_and_costs_creator_reputation() {
    let h = Harness::new();
    let market = h.create_market(0, 1).await;
    let before = h.state.registry.reputation().score(CREATOR);

    h.advance_to(1);
    market.close_betting().await.unwrap();
    assert_eq!(market.cancel_for_missing_proof().await, Ok(Transition::Unchanged));

    h.advance_to(2);
    market.cancel_for_missing_proof().await.unwrap();
    assert_eq!(market.status().await, MarketStatus::Cancelled);
    assert_eq!(market.view().await.cancel_reason.as_deref(), Some(REASON_NO_PROOF));
    assert_eq!(h.state.registry.reputation().score(CREATOR), before - 20);

    // Late proof is rejected.
    let err = market.submit_proof(CREATOR, "https://late").await.unwrap_err();
    assert!(err.is_guard_not_met());
}

#[tokio::test]
async fn test_unanimous_vote_completes_and_pays_out() {
    let h = Harness::new();
    let market = h.create_market(100, 1).await;
    h.fund("alice", 1_000, 0);
    h.fund("bob", 1_000, 0);
    h.fund("v1", 0, 10);
    h.fund("v2", 0, 10);

    market.place_bet("alice", Side::Yes, 150).await.unwrap();
    market.place_bet("bob", Side::No, 120).await.unwrap();

    h.advance_to(1);
    market.close_betting().await.unwrap();
    market.submit_proof(CREATOR, "https://results.example/bib/412").await.unwrap();
    market.vote("v1", Side::Yes).await.unwrap();
    market.vote("v2", Side::Yes).await.unwrap();

    h.advance_to(3);
    market.resolve().await.unwrap();
    assert_eq!(market.status().await, MarketStatus::Completed);
    assert_eq!(market.winning_side().await, WinningSide::Yes);

    // losing 120: fee 6, voter pool 12 (6 each), winners pool 102
    let info = market.resolution_info().await;
    assert_eq!(info.platform_fee_amount, 6);
    assert_eq!(info.voter_reward_pool, 12);
    assert_eq!(info.winners_pool, 102);
    assert_eq!(info.winning_voter_count, 2);
    assert_eq!(info.reward_per_winning_voter, 6);

    assert_eq!(market.claim_voter_rewards("v1").await, Ok((6, 10)));
    assert_eq!(market.claim_winnings("alice").await, Ok(252));
    assert_eq!(market.claim_voter_rewards("v2").await, Ok((6, 10)));

    let registry = &h.state.registry;
    assert_eq!(registry.get_internal_balances("alice").usd, 1_102);
    assert_eq!(registry.get_internal_balances("bob").usd, 880);
    assert_eq!(registry.get_internal_balances("v1").usd, 6);
    assert_eq!(registry.get_internal_balances("treasury").usd, 6);
    assert_eq!(registry.reputation().score("v1"), 53);
}

#[tokio::test]
async fn test_tie_cancels_and_returns_voter_bonds() {
    let h = Harness::new();
    let market = h.create_market(10, 1).await;
    h.fund("alice", 100, 0);
    h.fund("bob", 100, 0);
    h.fund("v1", 0, 10);
    h.fund("v2", 0, 10);
    market.place_bet("alice", Side::Yes, 40).await.unwrap();
    market.place_bet("bob", Side::No, 40).await.unwrap();

    h.advance_to(1);
    market.close_betting().await.unwrap();
    market.submit_proof(CREATOR, "https://proof").await.unwrap();
    market.vote("v1", Side::Yes).await.unwrap();
    market.vote("v2", Side::No).await.unwrap();

    h.advance_to(3);
    market.resolve().await.unwrap();
    assert_eq!(market.status().await, MarketStatus::Cancelled);
    assert_eq!(market.view().await.cancel_reason.as_deref(), Some(REASON_TIE));

    assert_eq!(market.claim_voter_rewards("v1").await, Ok((0, 10)));
    assert_eq!(market.claim_voter_rewards("v2").await, Ok((0, 10)));
    assert_eq!(market.claim_refund("alice").await, Ok(40));
    assert_eq!(market.claim_refund("bob").await, Ok(40));
    assert_eq!(
        market.claim_winnings("alice").await.unwrap_err(),
        MarketError::GuardNotMet("market is cancelled, expected completed".into())
    );
}

#[tokio::test]
async fn test_settlement_conserves_every_unit() {
    let h = Harness::new();
    let market = h.create_market(10, 1).await;
    for user in ["alice", "dave", "bob"] {
        h.fund(user, 1_000, 0);
    }
    for voter in ["v1", "v2", "v3", "v4"] {
        h.fund(voter, 0, 10);
    }

    market.place_bet("alice", Side::Yes, 100).await.unwrap();
    market.place_bet("dave", Side::Yes, 33).await.unwrap();
    market.place_bet("bob", Side::No, 200).await.unwrap();

    h.advance_to(1);
    market.close_betting().await.unwrap();
    market.submit_proof(CREATOR, "https://proof").await.unwrap();
    for voter in ["v1", "v2", "v3"] {
        market.vote(voter, Side::Yes).await.unwrap();
    }
    market.vote("v4", Side::No).await.unwrap();

    h.advance_to(3);
    market.resolve().await.unwrap();

    // fee 10, voter pool 20 (6 each, 2 dust), winners pool 170 split 100:33
    assert_eq!(market.claim_winnings("alice").await, Ok(227));
    assert_eq!(market.claim_winnings("dave").await, Ok(75));
    for voter in ["v1", "v2", "v3"] {
        assert_eq!(market.claim_voter_rewards(voter).await, Ok((6, 10)));
    }
    assert_eq!(
        market.claim_voter_rewards("v4").await,
        Err(MarketError::Ineligible(Ineligibility::NoVoterRewards))
    );

    let registry = &h.state.registry;
    let escrow = escrow_account(market.id());
    assert_eq!(registry.ledger().balance(&escrow, Asset::Usd), 0);
    assert_eq!(registry.ledger().balance(&escrow, Asset::Util), 0);
    // 10 fee + 2 voter dust + 1 winners dust; 10 creation fee + 10 forfeited bond
    assert_eq!(registry.get_internal_balances("treasury").usd, 13);
    assert_eq!(registry.get_internal_balances("treasury").util, 20);
    assert!(registry.ledger().audit().is_balanced());
}

#[tokio::test]
async fn test_claims_never_pay_twice() {
    let h = Harness::new();
    let market = h.create_market(10, 1).await;
    h.fund(CREATOR, 1_000, 0);
    h.fund("bob", 1_000, 0);
    h.fund("v1", 0, 10);

    market.place_bet(CREATOR, Side::Yes, 50).await.unwrap();
    market.place_bet("bob", Side::No, 50).await.unwrap();

    h.advance_to(1);
    market.close_betting().await.unwrap();
    market.submit_proof(CREATOR, "https://proof").await.unwrap();
    market.vote("v1", Side::Yes).await.unwrap();
    h.advance_to(3);
    market.resolve().await.unwrap();

    assert!(market.claim_winnings(CREATOR).await.is_ok());
    assert!(market.claim_winnings(CREATOR).await.is_err());
    assert_eq!(market.claim_creator_collateral(CREATOR).await, Ok(50));
    assert!(market.claim_creator_collateral(CREATOR).await.is_err());
    assert!(market.claim_voter_rewards("v1").await.is_ok());
    assert!(market.claim_voter_rewards("v1").await.is_err());

    let withdrawals = market
        .events()
        .await
        .into_iter()
        .filter(|e| matches!(e.event, MarketEvent::FundsWithdrawn { .. }))
        .count();
    assert_eq!(withdrawals, 2);
}

#[tokio::test]
async fn test_concurrent_checks_transition_exactly_once() {
    let h = Harness::new();
    let market = h.create_market(0, 1).await;
    h.advance_to(1);

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let m = market.clone();
        tasks.push(tokio::spawn(async move { m.close_betting().await }));
    }

    let mut advanced = 0;
    for t in tasks {
        if let Ok(Transition::Advanced { .. }) = t.await.unwrap() {
            advanced += 1;
        }
    }
    assert_eq!(advanced, 1);
    assert_eq!(market.status().await, MarketStatus::AwaitingProof);

    let closes = market
        .events()
        .await
        .into_iter()
        .filter(|e| matches!(e.event, MarketEvent::BettingClosed { .. }))
        .count();
    assert_eq!(closes, 1);
}

#[tokio::test]
async fn test_too_few_votes_cancels_and_refunds_everyone() {
    let h = Harness::new();
    let market = h.create_market(10, 2).await;
    h.fund("alice", 100, 0);
    h.fund("bob", 100, 0);
    h.fund("v1", 0, 10);
    market.place_bet("alice", Side::Yes, 40).await.unwrap();
    market.place_bet("bob", Side::No, 30).await.unwrap();

    h.advance_to(1);
    market.close_betting().await.unwrap();
    market.submit_proof(CREATOR, "https://proof").await.unwrap();
    market.vote("v1", Side::Yes).await.unwrap();

    h.advance_to(3);
    assert_eq!(
        market.resolve().await,
        Ok(Transition::Advanced {
            from: MarketStatus::Voting,
            to: MarketStatus::Cancelled,
        })
    );
    assert_eq!(market.view().await.cancel_reason.as_deref(), Some(REASON_INSUFFICIENT_VOTES));
    assert_eq!(market.winning_side().await, WinningSide::None);

    assert_eq!(market.claim_refund("alice").await, Ok(40));
    assert_eq!(market.claim_refund("bob").await, Ok(30));
    assert_eq!(market.claim_voter_rewards("v1").await, Ok((0, 10)));

    let registry = &h.state.registry;
    assert_eq!(registry.get_internal_balances("alice").usd, 100);
    assert_eq!(registry.get_internal_balances("bob").usd, 100);
    assert_eq!(registry.get_internal_balances("v1").util, 10);
}

#[tokio::test]
async fn test_no_votes_cancels_as_insufficient_not_tie() {
    for minimum_votes in [0, 1] {
        let h = Harness::new();
        let market = h.create_market(10, minimum_votes).await;
        h.fund("alice", 100, 0);
        h.fund("bob", 100, 0);
        market.place_bet("alice", Side::Yes, 25).await.unwrap();
        market.place_bet("bob", Side::No, 25).await.unwrap();

        h.advance_to(1);
        market.close_betting().await.unwrap();
        market.submit_proof(CREATOR, "https://proof").await.unwrap();

        h.advance_to(3);
        market.resolve().await.unwrap();
        assert_eq!(market.status().await, MarketStatus::Cancelled);
        assert_eq!(market.view().await.cancel_reason.as_deref(), Some(REASON_INSUFFICIENT_VOTES));
        assert_eq!(market.winning_side().await, WinningSide::None);

        assert_eq!(market.claim_refund("alice").await, Ok(25));
        assert_eq!(market.claim_refund("bob").await, Ok(25));
        assert!(h.state.registry.ledger().audit().is_balanced());
    }
}

#[tokio::test]
async fn test_escrow_cannot_be_staked_elsewhere() {
    let h = Harness::new();
    let first = h.create_market(10, 1).await;
    let second = h.create_market(10, 1).await;
    h.fund("alice", 100, 0);
    h.fund("bob", 100, 0);
    first.place_bet("alice", Side::Yes, 100).await.unwrap();
    first.place_bet("bob", Side::No, 100).await.unwrap();

    let escrow = escrow_account(first.id());
    for caller in [escrow.as_str(), "treasury"] {
        assert_eq!(
            second.place_bet(caller, Side::Yes, 200).await,
            Err(MarketError::Ineligible(Ineligibility::SystemAccount))
        );
    }
    assert_eq!(h.state.registry.ledger().balance(&escrow, Asset::Usd), 200);
    assert_eq!(second.total_yes_stake().await, 0);

    // Voting as an escrow is refused the same way.
    h.advance_to(1);
    first.close_betting().await.unwrap();
    first.submit_proof(CREATOR, "https://proof").await.unwrap();
    assert_eq!(
        first.vote(&escrow_account(second.id()), Side::No).await,
        Err(MarketError::Ineligible(Ineligibility::SystemAccount))
    );

    h.advance_to(3);
    first.resolve().await.unwrap();
    assert_eq!(first.view().await.cancel_reason.as_deref(), Some(REASON_INSUFFICIENT_VOTES));
    assert_eq!(first.claim_refund("alice").await, Ok(100));
    assert_eq!(first.claim_refund("bob").await, Ok(100));
}
