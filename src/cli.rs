use clap::{Parser, Subcommand, ValueEnum};
use erp_admin_common::{catalog, Resource};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "erp-admin")]
#[command(about = "ERP管理APIクライアント（財務・購買申請・仕入先・製品）", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// APIのベースURL（設定ファイル・環境変数より優先）
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 一覧を取得
    List {
        /// 対象ドメイン
        domain: DomainArg,

        /// ページ番号（1始まり）
        #[arg(short, long)]
        page: Option<u32>,

        /// 1ページの件数
        #[arg(long)]
        page_size: Option<u32>,

        /// 検索語
        #[arg(short, long)]
        search: Option<String>,

        /// 並び替えキー
        #[arg(long)]
        sort_by: Option<String>,

        /// 降順で並べる
        #[arg(long)]
        desc: bool,

        /// 絞り込み条件 (key=value、複数指定可)
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },

    /// 1件取得
    Get {
        domain: DomainArg,
        id: i64,
    },

    /// 新規作成
    Create {
        domain: DomainArg,

        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// 更新
    Update {
        domain: DomainArg,
        id: i64,

        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// 削除
    Delete {
        domain: DomainArg,
        id: i64,

        /// 確認なしで削除
        #[arg(short, long)]
        yes: bool,
    },

    /// 添付ファイルをアップロード
    Attach {
        domain: DomainArg,
        id: i64,

        /// アップロードするファイル
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// 添付ファイルをダウンロード
    Download {
        domain: DomainArg,
        id: i64,

        /// サーバー上のファイル名
        file_name: String,

        /// 保存先（省略時はカレントにファイル名で保存）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 添付ファイルを削除
    Detach {
        domain: DomainArg,
        id: i64,
        attachment_id: i64,
    },

    /// 設定を表示/編集
    Config {
        /// 認証トークンを保存
        #[arg(long)]
        set_token: Option<String>,

        /// 保存済みトークンを削除
        #[arg(long)]
        clear_token: bool,

        /// APIのベースURLを保存
        #[arg(long)]
        set_api_url: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

/// 作成・更新の本文（どちらか一方）
#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// JSON文字列
    #[arg(short, long)]
    pub data: Option<String>,

    /// JSONファイル
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DomainArg {
    Incomes,
    Expenses,
    Requisitions,
    Suppliers,
    Products,
}

impl DomainArg {
    pub fn resource(self) -> Resource {
        match self {
            DomainArg::Incomes => catalog::incomes(),
            DomainArg::Expenses => catalog::expenses(),
            DomainArg::Requisitions => catalog::requisitions(),
            DomainArg::Suppliers => catalog::suppliers(),
            DomainArg::Products => catalog::products(),
        }
    }
}

/// `key=value` 形式の絞り込み条件
pub fn parse_filter(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("key=value の形式で指定してください: {}", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("キーが空です: {}", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter("status=Active").unwrap(), ("status".to_string(), "Active".to_string()));
        assert_eq!(parse_filter("dateFrom=2024-01-01").unwrap().1, "2024-01-01");
        assert_eq!(parse_filter("note=a=b").unwrap().1, "a=b");
        assert!(parse_filter("status").is_err());
        assert!(parse_filter("=x").is_err());
    }

    #[test]
    fn test_domain_resource_paths() {
        assert_eq!(DomainArg::Incomes.resource().path, "/api/finance/incomes");
        assert_eq!(DomainArg::Products.resource().plural, "products");
    }

    #[test]
    fn test_parse_list_command() {
        let cli = Cli::try_parse_from([
            "erp-admin", "list", "suppliers", "--page", "2", "--filter", "status=Active", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::List { domain, page, filters, desc, .. } => {
                assert_eq!(domain, DomainArg::Suppliers);
                assert_eq!(page, Some(2));
                assert_eq!(filters, vec![("status".to_string(), "Active".to_string())]);
                assert!(!desc);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_create_requires_one_payload() {
        assert!(Cli::try_parse_from(["erp-admin", "create", "products"]).is_err());
        assert!(Cli::try_parse_from([
            "erp-admin", "create", "products", "--data", "{}", "--file", "x.json",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["erp-admin", "create", "products", "--data", "{}"]).is_ok());
    }
}
