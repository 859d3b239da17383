//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `memberhub_core` linkage and print its version.
//! - Run one create/read/delete pass against an in-memory store.

use memberhub_core::{
    CachedMemberRepository, Member, MemberRepository, MemoryCache, MemoryChannel, RepoConfig,
    RepoResult, SqliteMemberStore,
};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    println!("memberhub_core ping={}", memberhub_core::ping());
    println!("memberhub_core version={}", memberhub_core::core_version());

    match smoke() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("memberhub smoke failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn smoke() -> RepoResult<()> {
    let store = Arc::new(SqliteMemberStore::open_in_memory()?);
    let channel = Arc::new(MemoryChannel::new());
    let config = RepoConfig::default();
    let repo = CachedMemberRepository::new(
        store,
        Arc::new(MemoryCache::new()),
        channel.clone(),
        config.clone(),
    )?;

    let mut member = Member::new("smoke_user", "not-a-real-hash");
    let id = repo.save_member(&mut member)?;
    let loaded = repo.get_member(id)?;
    let balance = repo.get_account(id)?.map_or(0.0, |account| account.balance);
    println!(
        "member id={id} usr={} balance={balance}",
        loaded.map(|m| m.usr).unwrap_or_default()
    );

    let rows = repo.delete_member(id)?;
    println!(
        "deleted rows={rows} present_after_delete={} queued_events={}",
        repo.get_member(id)?.is_some(),
        channel.queue_len(&config.member_update_queue)
    );
    Ok(())
}
