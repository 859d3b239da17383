use memberhub_core::{
    Address, BalanceInfo, BalanceLog, BuyerGroup, CachedMemberRepository, FavoriteKind,
    IntegralLog, Level, LevelUpLog, Member, MemberRepository, MemoryCache, MemoryChannel,
    Relation, RepoConfig, RepoError, SqliteMemberStore, StoreError, ValidationError, WalletLog,
};
use std::sync::Arc;
use std::thread;

fn repository() -> (Arc<CachedMemberRepository>, Arc<MemoryCache>) {
    let store = Arc::new(SqliteMemberStore::open_in_memory().unwrap());
    let cache = Arc::new(MemoryCache::new());
    let repo = CachedMemberRepository::new(
        store,
        cache.clone(),
        Arc::new(MemoryChannel::new()),
        RepoConfig::default(),
    )
    .unwrap();
    (Arc::new(repo), cache)
}

fn register(repo: &CachedMemberRepository, usr: &str) -> i64 {
    repo.save_member(&mut Member::new(usr, "hash")).unwrap()
}

fn default_ids(repo: &CachedMemberRepository, member_id: i64) -> Vec<i64> {
    repo.addresses(member_id)
        .unwrap()
        .into_iter()
        .filter(|address| address.is_default)
        .map(|address| address.id)
        .collect()
}

#[test]
fn at_most_one_default_address_per_member() {
    let (repo, _) = repository();
    let id = register(&repo, "alice");

    let mut home = Address::new(id, "Alice", "1 Home Rd");
    home.is_default = true;
    repo.save_address(&mut home).unwrap();
    let mut office = Address::new(id, "Alice", "2 Office St");
    office.is_default = true;
    repo.save_address(&mut office).unwrap();
    assert_eq!(default_ids(&repo, id), vec![office.id]);

    assert!(repo.set_default_address(id, home.id).unwrap());
    assert_eq!(default_ids(&repo, id), vec![home.id]);
    let cached_office = repo.get_address(id, office.id).unwrap().unwrap();
    assert!(!cached_office.is_default);

    let mut plain = Address::new(id, "Alice", "3 Spare Ln");
    repo.save_address(&mut plain).unwrap();
    assert_eq!(default_ids(&repo, id), vec![home.id]);
    assert_eq!(repo.addresses(id).unwrap().len(), 3);
}

#[test]
fn addresses_are_scoped_to_their_owner() {
    let (repo, _) = repository();
    let alice = register(&repo, "alice");
    let bob = register(&repo, "bob");
    let mut address = Address::new(alice, "Alice", "1 Home Rd");
    let address_id = repo.save_address(&mut address).unwrap();

    assert!(repo.get_address(bob, address_id).unwrap().is_none());
    assert!(!repo.set_default_address(bob, address_id).unwrap());
    assert_eq!(repo.delete_address(bob, address_id).unwrap(), 0);

    let mut stolen = address.clone();
    stolen.member_id = bob;
    let err = repo.save_address(&mut stolen).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::AddressOwnerMismatch { .. })
    ));

    assert_eq!(repo.delete_address(alice, address_id).unwrap(), 1);
    assert!(repo.get_address(alice, address_id).unwrap().is_none());
}

#[test]
fn level_manager_is_shared_across_threads() {
    let (repo, _) = repository();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = Arc::clone(&repo);
            thread::spawn(move || repo.level_manager())
        })
        .collect();
    let managers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(managers.iter().all(|m| Arc::ptr_eq(m, &managers[0])));
    assert!(Arc::ptr_eq(&managers[0], &repo.level_manager()));
}

#[test]
fn level_collection_is_cached_and_swept_on_change() {
    let (repo, cache) = repository();
    let levels = repo.level_manager();
    let mut silver = Level::new("silver", 100);
    let mut gold = Level::new("gold", 500);
    levels.save_level(&mut silver).unwrap();
    levels.save_level(&mut gold).unwrap();

    let names: Vec<String> = levels.levels().unwrap().into_iter().map(|l| l.name).collect();
    assert_eq!(names, vec!["silver", "gold"]);
    let keys = repo.cache_keys();
    assert!(cache.contains(&keys.level_set()));
    assert!(cache.contains(&keys.level_marker()));

    let mut platinum = Level::new("platinum", 1000);
    levels.save_level(&mut platinum).unwrap();
    assert!(!cache.contains(&keys.level_marker()));
    assert_eq!(levels.levels().unwrap().len(), 3);

    assert_eq!(levels.level_for_exp(600).unwrap().unwrap().id, gold.id);
    assert!(levels.level_for_exp(10).unwrap().is_none());
    assert_eq!(levels.next_level(silver.id).unwrap().unwrap().id, gold.id);
    assert_eq!(levels.level_by_id(platinum.id).unwrap().unwrap().name, "platinum");
    assert_eq!(repo.level_value_by_exp(1200).unwrap(), Some(platinum.id));

    assert_eq!(levels.delete_level(platinum.id).unwrap(), 1);
    assert!(levels.level_by_id(platinum.id).unwrap().is_none());
}

#[test]
fn blank_level_name_is_rejected() {
    let (repo, _) = repository();
    let err = repo
        .level_manager()
        .save_level(&mut Level::new("  ", 0))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::EmptyLevelName)
    ));
}

#[test]
fn members_are_counted_by_level() {
    let (repo, _) = repository();
    let id = register(&repo, "alice");
    register(&repo, "bob");
    let mut member = repo.get_member(id).unwrap().unwrap();
    member.level = 2;
    repo.save_member(&mut member).unwrap();

    assert_eq!(repo.count_members().unwrap(), 2);
    assert_eq!(repo.count_members_by_level(2).unwrap(), 1);
    assert_eq!(repo.count_members_by_level(0).unwrap(), 1);
}

#[test]
fn favorites_are_idempotent() {
    let (repo, _) = repository();
    let id = register(&repo, "alice");

    assert!(repo.favorite(id, FavoriteKind::Goods, 9).unwrap());
    assert!(!repo.favorite(id, FavoriteKind::Goods, 9).unwrap());
    assert!(repo.favored(id, FavoriteKind::Goods, 9).unwrap());
    assert!(!repo.favored(id, FavoriteKind::Shop, 9).unwrap());
    assert_eq!(repo.cancel_favorite(id, FavoriteKind::Goods, 9).unwrap(), 1);
    assert!(!repo.favored(id, FavoriteKind::Goods, 9).unwrap());
}

#[test]
fn invitation_tree_queries() {
    let (repo, _) = repository();
    let root = register(&repo, "root");
    let child = register(&repo, "child");
    let grandchild = register(&repo, "grandchild");
    for (member_id, inviter_id) in [(child, root), (grandchild, child)] {
        let mut relation = repo.get_relation(member_id).unwrap().unwrap();
        relation.inviter_id = inviter_id;
        repo.save_relation(&mut relation).unwrap();
    }

    let (total, page) = repo.invitees(root, 0, 10).unwrap();
    assert_eq!(total, 1);
    assert_eq!(page[0].usr, "child");
    let counts = repo.sub_invitation_counts(&[root, child, grandchild]).unwrap();
    assert_eq!(counts.values().copied().collect::<Vec<_>>(), vec![1, 1, 0]);
    assert_eq!(repo.inviter_of(grandchild).unwrap().unwrap().id, child);
    assert_eq!(
        repo.get_relation(child).unwrap().unwrap(),
        Relation {
            inviter_id: root,
            ..Relation::blank(child)
        }
    );
}

#[test]
fn history_rows_are_swept_with_their_member() {
    let (repo, _) = repository();
    let id = register(&repo, "alice");
    let mut levelup = LevelUpLog {
        member_id: id,
        origin_level: 1,
        target_level: 2,
        ..LevelUpLog::default()
    };
    let log_id = repo.save_level_up_log(&mut levelup).unwrap();
    let mut integral = IntegralLog {
        member_id: id,
        title: "sign in".to_string(),
        value: 5,
        ..IntegralLog::default()
    };
    repo.save_integral_log(&mut integral).unwrap();
    repo.favorite(id, FavoriteKind::Shop, 1).unwrap();
    repo.save_address(&mut Address::new(id, "Alice", "1 Home Rd"))
        .unwrap();

    let stored = repo.get_level_up_log(log_id).unwrap().unwrap();
    assert!(stored.create_time > 0);

    repo.delete_member(id).unwrap();
    assert!(repo.get_level_up_log(log_id).unwrap().is_none());
    assert!(!repo.favored(id, FavoriteKind::Shop, 1).unwrap());
    assert!(repo.addresses(id).unwrap().is_empty());
}

#[test]
fn history_without_owner_is_rejected() {
    let (repo, _) = repository();
    let err = repo
        .save_integral_log(&mut IntegralLog::default())
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::MissingOwner(_))
    ));
}

#[test]
fn ledgers_are_saved_looked_up_and_swept() {
    let (repo, _) = repository();
    let id = register(&repo, "alice");

    let mut charge = BalanceLog {
        member_id: id,
        outer_no: "ORD-1".to_string(),
        title: "charge".to_string(),
        amount: 50.0,
        ..BalanceLog::default()
    };
    assert!(repo.save_balance_log(&mut charge).unwrap() > 0);
    assert!(charge.create_time > 0);

    let mut present = WalletLog {
        member_id: id,
        title: "present".to_string(),
        amount: 5.0,
        ..WalletLog::default()
    };
    let wallet_id = repo.save_wallet_log(&mut present).unwrap();
    let first_update = present.update_time;
    present.review_state = 1;
    repo.save_wallet_log(&mut present).unwrap();
    assert!(present.update_time > first_update);
    assert_eq!(repo.get_wallet_log(wallet_id).unwrap().unwrap().review_state, 1);

    let mut info = BalanceInfo {
        member_id: id,
        trade_no: "TR-1".to_string(),
        amount: 20.0,
        ..BalanceInfo::default()
    };
    let info_id = repo.save_balance_info(&mut info).unwrap();
    assert_eq!(repo.get_balance_info(info_id).unwrap().unwrap().amount, 20.0);
    assert_eq!(
        repo.get_balance_info_by_no("TR-1").unwrap().unwrap().id,
        info_id
    );
    info.state = 2;
    repo.save_balance_info(&mut info).unwrap();

    let mut clash = BalanceInfo {
        member_id: id,
        trade_no: "TR-1".to_string(),
        ..BalanceInfo::default()
    };
    assert!(matches!(
        repo.save_balance_info(&mut clash).unwrap_err(),
        RepoError::Validation(ValidationError::TradeNoTaken(_))
    ));

    repo.delete_member(id).unwrap();
    assert!(repo.get_wallet_log(wallet_id).unwrap().is_none());
    assert!(repo.get_balance_info(info_id).unwrap().is_none());
}

#[test]
fn ledgers_without_owner_are_rejected() {
    let (repo, _) = repository();
    assert!(matches!(
        repo.save_balance_log(&mut BalanceLog::default()).unwrap_err(),
        RepoError::Validation(ValidationError::MissingOwner(_))
    ));
    assert!(matches!(
        repo.save_wallet_log(&mut WalletLog::default()).unwrap_err(),
        RepoError::Validation(ValidationError::MissingOwner(_))
    ));
}

#[test]
fn buyer_groups_are_listed_by_id() {
    let (repo, _) = repository();
    let mut retail = BuyerGroup::new("retail");
    let mut wholesale = BuyerGroup::new("wholesale");
    wholesale.enable_wholesale = true;
    repo.save_buyer_group(&mut retail).unwrap();
    repo.save_buyer_group(&mut wholesale).unwrap();

    retail.rebate_period = 7;
    repo.save_buyer_group(&mut retail).unwrap();

    let groups = repo.buyer_groups().unwrap();
    assert_eq!(groups, vec![retail.clone(), wholesale]);

    assert!(matches!(
        repo.save_buyer_group(&mut BuyerGroup::new(" ")).unwrap_err(),
        RepoError::Validation(ValidationError::EmptyGroupName)
    ));
    let mut unknown = BuyerGroup {
        id: 404,
        ..retail
    };
    assert!(matches!(
        repo.save_buyer_group(&mut unknown).unwrap_err(),
        RepoError::Store(StoreError::NotFound(_))
    ));
}

#[test]
fn take_out_counter_counts_per_member() {
    let (repo, cache) = repository();
    let id = register(&repo, "alice");

    assert_eq!(repo.take_out_times(id).unwrap(), 0);
    assert_eq!(repo.record_take_out(id).unwrap(), 1);
    assert_eq!(repo.record_take_out(id).unwrap(), 2);
    assert_eq!(repo.take_out_times(id).unwrap(), 2);
    assert_eq!(repo.take_out_times(id + 1).unwrap(), 0);
    assert!(cache.contains(&repo.cache_keys().take_out_times(id)));
}
