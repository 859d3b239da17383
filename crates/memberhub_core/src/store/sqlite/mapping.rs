//! Row mapping between member records and their SQLite tables.

use crate::model::{
    Account, Address, BalanceInfo, BalanceLog, BankInfo, BuyerGroup, Favorite, FavoriteKind,
    IntegralLog, Level, LevelUpLog, Member, MemberState, Profile, Record, Relation, TrustedInfo,
    WalletLog,
};
use crate::store::{StoreError, StoreResult};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};

/// Table layout of one record kind.
///
/// `COLUMNS` lists the non-key columns in the same order `values` emits.
pub(crate) trait SqlRecord: Record {
    const TABLE: &'static str;
    const KEY_COLUMN: &'static str;
    const COLUMNS: &'static [&'static str];
    /// Column holding the owning member id, if the table has one.
    const OWNER_COLUMN: Option<&'static str>;

    fn key_to_sql(key: Self::Key) -> i64;

    fn key_from_sql(raw: i64) -> StoreResult<Self::Key>;

    fn values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> StoreResult<Self>;

    /// Runs inside the save transaction before the row is written.
    fn before_save(&self, _conn: &Connection) -> rusqlite::Result<()> {
        Ok(())
    }
}

macro_rules! i64_key {
    () => {
        fn key_to_sql(key: i64) -> i64 {
            key
        }

        fn key_from_sql(raw: i64) -> StoreResult<i64> {
            Ok(raw)
        }
    };
}

macro_rules! i32_key {
    () => {
        fn key_to_sql(key: i32) -> i64 {
            i64::from(key)
        }

        fn key_from_sql(raw: i64) -> StoreResult<i32> {
            i32::try_from(raw).map_err(|_| {
                StoreError::InvalidData(format!("key {raw} out of range in {}", Self::TABLE))
            })
        }
    };
}

fn invalid(table: &str, column: &str, value: impl std::fmt::Display) -> StoreError {
    StoreError::InvalidData(format!("invalid value `{value}` in {table}.{column}"))
}

impl SqlRecord for Member {
    const TABLE: &'static str = "mm_member";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "usr",
        "pwd",
        "trade_pwd",
        "exp",
        "level",
        "invitation_code",
        "premium_user",
        "premium_expires",
        "reg_from",
        "reg_ip",
        "reg_time",
        "check_code",
        "check_expires",
        "state",
        "login_time",
        "last_login_time",
        "update_time",
    ];
    const OWNER_COLUMN: Option<&'static str> = Some("id");

    i64_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.usr.clone()),
            Value::from(self.pwd.clone()),
            Value::from(self.trade_pwd.clone()),
            Value::from(self.exp),
            Value::from(self.level),
            Value::from(self.invitation_code.clone()),
            Value::from(self.premium_user),
            Value::from(self.premium_expires),
            Value::from(self.reg_from.clone()),
            Value::from(self.reg_ip.clone()),
            Value::from(self.reg_time),
            Value::from(self.check_code.clone()),
            Value::from(self.check_expires),
            Value::from(self.state.to_db()),
            Value::from(self.login_time),
            Value::from(self.last_login_time),
            Value::from(self.update_time),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let raw_state: i64 = row.get("state")?;
        let state = MemberState::from_db(raw_state)
            .ok_or_else(|| invalid(Self::TABLE, "state", raw_state))?;
        Ok(Self {
            id: row.get("id")?,
            usr: row.get("usr")?,
            pwd: row.get("pwd")?,
            trade_pwd: row.get("trade_pwd")?,
            exp: row.get("exp")?,
            level: row.get("level")?,
            invitation_code: row.get("invitation_code")?,
            premium_user: row.get("premium_user")?,
            premium_expires: row.get("premium_expires")?,
            reg_from: row.get("reg_from")?,
            reg_ip: row.get("reg_ip")?,
            reg_time: row.get("reg_time")?,
            check_code: row.get("check_code")?,
            check_expires: row.get("check_expires")?,
            state,
            login_time: row.get("login_time")?,
            last_login_time: row.get("last_login_time")?,
            update_time: row.get("update_time")?,
        })
    }
}

impl SqlRecord for Profile {
    const TABLE: &'static str = "mm_profile";
    const KEY_COLUMN: &'static str = "member_id";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "avatar",
        "sex",
        "birthday",
        "phone",
        "address",
        "im",
        "email",
        "province",
        "city",
        "district",
        "remark",
        "update_time",
    ];
    const OWNER_COLUMN: Option<&'static str> = Some("member_id");

    i64_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.name.clone()),
            Value::from(self.avatar.clone()),
            Value::from(self.sex),
            Value::from(self.birthday.clone()),
            Value::from(self.phone.clone()),
            Value::from(self.address.clone()),
            Value::from(self.im.clone()),
            Value::from(self.email.clone()),
            Value::from(self.province),
            Value::from(self.city),
            Value::from(self.district),
            Value::from(self.remark.clone()),
            Value::from(self.update_time),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            member_id: row.get("member_id")?,
            name: row.get("name")?,
            avatar: row.get("avatar")?,
            sex: row.get("sex")?,
            birthday: row.get("birthday")?,
            phone: row.get("phone")?,
            address: row.get("address")?,
            im: row.get("im")?,
            email: row.get("email")?,
            province: row.get("province")?,
            city: row.get("city")?,
            district: row.get("district")?,
            remark: row.get("remark")?,
            update_time: row.get("update_time")?,
        })
    }
}

impl SqlRecord for Account {
    const TABLE: &'static str = "mm_account";
    const KEY_COLUMN: &'static str = "member_id";
    const COLUMNS: &'static [&'static str] = &[
        "integral",
        "balance",
        "wallet_balance",
        "grow_balance",
        "grow_amount",
        "grow_earnings",
        "grow_total_earnings",
        "total_expense",
        "total_charge",
        "total_pay",
        "update_time",
    ];
    const OWNER_COLUMN: Option<&'static str> = Some("member_id");

    i64_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.integral),
            Value::from(self.balance),
            Value::from(self.wallet_balance),
            Value::from(self.grow_balance),
            Value::from(self.grow_amount),
            Value::from(self.grow_earnings),
            Value::from(self.grow_total_earnings),
            Value::from(self.total_expense),
            Value::from(self.total_charge),
            Value::from(self.total_pay),
            Value::from(self.update_time),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            member_id: row.get("member_id")?,
            integral: row.get("integral")?,
            balance: row.get("balance")?,
            wallet_balance: row.get("wallet_balance")?,
            grow_balance: row.get("grow_balance")?,
            grow_amount: row.get("grow_amount")?,
            grow_earnings: row.get("grow_earnings")?,
            grow_total_earnings: row.get("grow_total_earnings")?,
            total_expense: row.get("total_expense")?,
            total_charge: row.get("total_charge")?,
            total_pay: row.get("total_pay")?,
            update_time: row.get("update_time")?,
        })
    }
}

impl SqlRecord for Relation {
    const TABLE: &'static str = "mm_relation";
    const KEY_COLUMN: &'static str = "member_id";
    const COLUMNS: &'static [&'static str] = &["card_no", "inviter_id", "inviter_str", "reg_mch_id"];
    const OWNER_COLUMN: Option<&'static str> = Some("member_id");

    i64_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.card_no.clone()),
            Value::from(self.inviter_id),
            Value::from(self.inviter_str.clone()),
            Value::from(self.reg_mch_id),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            member_id: row.get("member_id")?,
            card_no: row.get("card_no")?,
            inviter_id: row.get("inviter_id")?,
            inviter_str: row.get("inviter_str")?,
            reg_mch_id: row.get("reg_mch_id")?,
        })
    }
}

impl SqlRecord for BankInfo {
    const TABLE: &'static str = "mm_bank";
    const KEY_COLUMN: &'static str = "member_id";
    const COLUMNS: &'static [&'static str] = &[
        "bank_name",
        "account",
        "account_name",
        "network",
        "state",
        "is_locked",
        "update_time",
    ];
    const OWNER_COLUMN: Option<&'static str> = Some("member_id");

    i64_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.bank_name.clone()),
            Value::from(self.account.clone()),
            Value::from(self.account_name.clone()),
            Value::from(self.network.clone()),
            Value::from(self.state),
            Value::from(self.is_locked),
            Value::from(self.update_time),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            member_id: row.get("member_id")?,
            bank_name: row.get("bank_name")?,
            account: row.get("account")?,
            account_name: row.get("account_name")?,
            network: row.get("network")?,
            state: row.get("state")?,
            is_locked: row.get("is_locked")?,
            update_time: row.get("update_time")?,
        })
    }
}

impl SqlRecord for TrustedInfo {
    const TABLE: &'static str = "mm_trusted_info";
    const KEY_COLUMN: &'static str = "member_id";
    const COLUMNS: &'static [&'static str] = &[
        "real_name",
        "card_id",
        "trust_image",
        "reviewed",
        "review_time",
        "remark",
        "update_time",
    ];
    const OWNER_COLUMN: Option<&'static str> = Some("member_id");

    i64_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.real_name.clone()),
            Value::from(self.card_id.clone()),
            Value::from(self.trust_image.clone()),
            Value::from(self.reviewed),
            Value::from(self.review_time),
            Value::from(self.remark.clone()),
            Value::from(self.update_time),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            member_id: row.get("member_id")?,
            real_name: row.get("real_name")?,
            card_id: row.get("card_id")?,
            trust_image: row.get("trust_image")?,
            reviewed: row.get("reviewed")?,
            review_time: row.get("review_time")?,
            remark: row.get("remark")?,
            update_time: row.get("update_time")?,
        })
    }
}

impl SqlRecord for Address {
    const TABLE: &'static str = "mm_deliver_addr";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "member_id",
        "real_name",
        "phone",
        "province",
        "city",
        "district",
        "area",
        "address",
        "is_default",
    ];
    const OWNER_COLUMN: Option<&'static str> = Some("member_id");

    i64_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.member_id),
            Value::from(self.real_name.clone()),
            Value::from(self.phone.clone()),
            Value::from(self.province),
            Value::from(self.city),
            Value::from(self.district),
            Value::from(self.area.clone()),
            Value::from(self.address.clone()),
            Value::from(self.is_default),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            member_id: row.get("member_id")?,
            real_name: row.get("real_name")?,
            phone: row.get("phone")?,
            province: row.get("province")?,
            city: row.get("city")?,
            district: row.get("district")?,
            area: row.get("area")?,
            address: row.get("address")?,
            is_default: row.get("is_default")?,
        })
    }

    /// Clears the flag on every other address of the member so the partial
    /// unique index never sees two defaults.
    fn before_save(&self, conn: &Connection) -> rusqlite::Result<()> {
        if self.is_default {
            conn.execute(
                "UPDATE mm_deliver_addr SET is_default = 0
                 WHERE member_id = ?1 AND id <> ?2 AND is_default = 1;",
                params![self.member_id, self.id],
            )?;
        }
        Ok(())
    }
}

impl SqlRecord for Level {
    const TABLE: &'static str = "mm_level";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "require_exp",
        "program_signal",
        "is_official",
        "enabled",
        "allow_upgrade",
    ];
    const OWNER_COLUMN: Option<&'static str> = None;

    i32_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.name.clone()),
            Value::from(self.require_exp),
            Value::from(self.program_signal.clone()),
            Value::from(self.is_official),
            Value::from(self.enabled),
            Value::from(self.allow_upgrade),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            require_exp: row.get("require_exp")?,
            program_signal: row.get("program_signal")?,
            is_official: row.get("is_official")?,
            enabled: row.get("enabled")?,
            allow_upgrade: row.get("allow_upgrade")?,
        })
    }
}

impl SqlRecord for Favorite {
    const TABLE: &'static str = "mm_favorite";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["member_id", "fav_type", "refer_id", "update_time"];
    const OWNER_COLUMN: Option<&'static str> = Some("member_id");

    i64_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.member_id),
            Value::from(self.kind.to_db()),
            Value::from(self.refer_id),
            Value::from(self.update_time),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let raw_kind: i64 = row.get("fav_type")?;
        let kind = FavoriteKind::from_db(raw_kind)
            .ok_or_else(|| invalid(Self::TABLE, "fav_type", raw_kind))?;
        Ok(Self {
            id: row.get("id")?,
            member_id: row.get("member_id")?,
            kind,
            refer_id: row.get("refer_id")?,
            update_time: row.get("update_time")?,
        })
    }
}

impl SqlRecord for LevelUpLog {
    const TABLE: &'static str = "mm_levelup";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "member_id",
        "origin_level",
        "target_level",
        "is_free",
        "payment_id",
        "reviewed",
        "create_time",
    ];
    const OWNER_COLUMN: Option<&'static str> = Some("member_id");

    i32_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.member_id),
            Value::from(self.origin_level),
            Value::from(self.target_level),
            Value::from(self.is_free),
            Value::from(self.payment_id),
            Value::from(self.reviewed),
            Value::from(self.create_time),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            member_id: row.get("member_id")?,
            origin_level: row.get("origin_level")?,
            target_level: row.get("target_level")?,
            is_free: row.get("is_free")?,
            payment_id: row.get("payment_id")?,
            reviewed: row.get("reviewed")?,
            create_time: row.get("create_time")?,
        })
    }
}

impl SqlRecord for IntegralLog {
    const TABLE: &'static str = "mm_integral_log";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "member_id",
        "kind",
        "title",
        "value",
        "remark",
        "create_time",
    ];
    const OWNER_COLUMN: Option<&'static str> = Some("member_id");

    i64_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.member_id),
            Value::from(self.kind),
            Value::from(self.title.clone()),
            Value::from(self.value),
            Value::from(self.remark.clone()),
            Value::from(self.create_time),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            member_id: row.get("member_id")?,
            kind: row.get("kind")?,
            title: row.get("title")?,
            value: row.get("value")?,
            remark: row.get("remark")?,
            create_time: row.get("create_time")?,
        })
    }
}

impl SqlRecord for BalanceLog {
    const TABLE: &'static str = "mm_balance_log";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "member_id",
        "outer_no",
        "kind",
        "title",
        "amount",
        "procedure_fee",
        "state",
        "remark",
        "create_time",
        "update_time",
    ];
    const OWNER_COLUMN: Option<&'static str> = Some("member_id");

    i32_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.member_id),
            Value::from(self.outer_no.clone()),
            Value::from(self.kind),
            Value::from(self.title.clone()),
            Value::from(self.amount),
            Value::from(self.procedure_fee),
            Value::from(self.state),
            Value::from(self.remark.clone()),
            Value::from(self.create_time),
            Value::from(self.update_time),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            member_id: row.get("member_id")?,
            outer_no: row.get("outer_no")?,
            kind: row.get("kind")?,
            title: row.get("title")?,
            amount: row.get("amount")?,
            procedure_fee: row.get("procedure_fee")?,
            state: row.get("state")?,
            remark: row.get("remark")?,
            create_time: row.get("create_time")?,
            update_time: row.get("update_time")?,
        })
    }
}

impl SqlRecord for WalletLog {
    const TABLE: &'static str = "mm_wallet_log";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "member_id",
        "outer_no",
        "kind",
        "title",
        "amount",
        "procedure_fee",
        "review_state",
        "remark",
        "create_time",
        "update_time",
    ];
    const OWNER_COLUMN: Option<&'static str> = Some("member_id");

    i32_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.member_id),
            Value::from(self.outer_no.clone()),
            Value::from(self.kind),
            Value::from(self.title.clone()),
            Value::from(self.amount),
            Value::from(self.procedure_fee),
            Value::from(self.review_state),
            Value::from(self.remark.clone()),
            Value::from(self.create_time),
            Value::from(self.update_time),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            member_id: row.get("member_id")?,
            outer_no: row.get("outer_no")?,
            kind: row.get("kind")?,
            title: row.get("title")?,
            amount: row.get("amount")?,
            procedure_fee: row.get("procedure_fee")?,
            review_state: row.get("review_state")?,
            remark: row.get("remark")?,
            create_time: row.get("create_time")?,
            update_time: row.get("update_time")?,
        })
    }
}

impl SqlRecord for BalanceInfo {
    const TABLE: &'static str = "mm_balance_info";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "member_id",
        "trade_no",
        "kind",
        "title",
        "amount",
        "csn_amount",
        "state",
        "create_time",
        "update_time",
    ];
    const OWNER_COLUMN: Option<&'static str> = Some("member_id");

    i32_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.member_id),
            Value::from(self.trade_no.clone()),
            Value::from(self.kind),
            Value::from(self.title.clone()),
            Value::from(self.amount),
            Value::from(self.csn_amount),
            Value::from(self.state),
            Value::from(self.create_time),
            Value::from(self.update_time),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            member_id: row.get("member_id")?,
            trade_no: row.get("trade_no")?,
            kind: row.get("kind")?,
            title: row.get("title")?,
            amount: row.get("amount")?,
            csn_amount: row.get("csn_amount")?,
            state: row.get("state")?,
            create_time: row.get("create_time")?,
            update_time: row.get("update_time")?,
        })
    }
}

impl SqlRecord for BuyerGroup {
    const TABLE: &'static str = "mm_buyer_group";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] =
        &["name", "enable_retail", "enable_wholesale", "rebate_period"];
    const OWNER_COLUMN: Option<&'static str> = None;

    i32_key!();

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.name.clone()),
            Value::from(self.enable_retail),
            Value::from(self.enable_wholesale),
            Value::from(self.rebate_period),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            enable_retail: row.get("enable_retail")?,
            enable_wholesale: row.get("enable_wholesale")?,
            rebate_period: row.get("rebate_period")?,
        })
    }
}

/// `SELECT` list for one record kind: key column first, then `COLUMNS`.
pub(crate) fn select_list<E: SqlRecord>() -> String {
    let mut columns = Vec::with_capacity(E::COLUMNS.len() + 1);
    columns.push(E::KEY_COLUMN);
    columns.extend_from_slice(E::COLUMNS);
    columns.join(", ")
}
