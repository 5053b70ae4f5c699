use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Result;
use git2::{Repository, Signature};
use image::{ImageFormat, Rgba, RgbaImage};
use patchnote::announce::AnnouncementWriter;
use patchnote::config::PressConfig;
use patchnote::git::GitRepository;
use patchnote::notify::{DraftDirectorySink, BANNER_FILE_NAME, DRAFT_FILE_NAME};
use patchnote::{ReleaseOutcome, ReleasePipeline};
use tempfile::TempDir;

/// Temporary game repository with real commits.
struct TestRepo {
    _temp_dir: TempDir,
    repo_path: PathBuf,
    repo: Repository,
}

impl TestRepo {
    fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let repo_path = temp_dir.path().to_path_buf();
        let repo = Repository::init(&repo_path)?;

        let mut config = repo.config()?;
        config.set_str("user.name", "Test User")?;
        config.set_str("user.email", "test@example.com")?;

        Ok(Self {
            _temp_dir: temp_dir,
            repo_path,
            repo,
        })
    }

    fn commit(&self, message: &str, files: &[(&str, Vec<u8>)]) -> Result<git2::Oid> {
        let mut index = self.repo.index()?;
        for (path, bytes) in files {
            let location = self.repo_path.join(path);
            if let Some(parent) = location.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&location, bytes)?;
            index.add_path(Path::new(path))?;
        }
        index.write()?;

        let tree = self.repo.find_tree(index.write_tree()?)?;
        let signature = Signature::now("Test User", "test@example.com")?;
        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        Ok(self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?)
    }

    fn tag(&self, name: &str) -> Result<()> {
        let head = self.repo.head()?.peel_to_commit()?;
        self.repo.tag_lightweight(name, head.as_object(), false)?;
        Ok(())
    }

    fn pipeline(&self, config: &PressConfig, drafts: &Path) -> Result<ReleasePipeline> {
        ReleasePipeline::new(
            GitRepository::open_at(&self.repo_path)?,
            config,
            AnnouncementWriter::new(None),
            Box::new(DraftDirectorySink::new(drafts)),
        )
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbaImage::from_pixel(width, height, Rgba([40, 120, 60, 255]));
    for x in 0..width {
        img.put_pixel(x, height / 2, Rgba([250, 240, 30, 255]));
    }
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn read_draft(receipt_dir: &Path) -> serde_yaml::Value {
    let text = std::fs::read_to_string(receipt_dir.join(DRAFT_FILE_NAME)).unwrap();
    serde_yaml::from_str(&text).unwrap()
}

fn drafted(outcome: &ReleaseOutcome) -> &patchnote::notify::DraftReceipt {
    match outcome {
        ReleaseOutcome::Drafted(receipt) => receipt,
        other => panic!("expected a draft, got {other:?}"),
    }
}

#[tokio::test]
async fn release_since_tag_uses_co_located_screenshot() {
    let test_repo = TestRepo::new().unwrap();
    test_repo
        .commit("chore: initial project", &[("src/main.rs", b"fn main() {}".to_vec())])
        .unwrap();
    test_repo.tag("v1.0.0").unwrap();
    test_repo
        .commit(
            "feat: add dragon boss encounter",
            &[
                ("src/boss.rs", b"pub fn boss() {}".to_vec()),
                ("assets/screenshots/dragon_boss.png", png(1280, 720)),
            ],
        )
        .unwrap();
    test_repo
        .commit("ci: cache build artifacts", &[(".github/ci.yml", b"on: push".to_vec())])
        .unwrap();

    let repo = GitRepository::open_at(&test_repo.repo_path).unwrap();
    let range = repo.default_release_range().unwrap();
    assert_eq!(range, "v1.0.0..HEAD");

    let drafts = TempDir::new().unwrap();
    let pipeline = test_repo
        .pipeline(&PressConfig::default(), drafts.path())
        .unwrap();
    let reports = pipeline.run(&[range]).await.unwrap();
    assert_eq!(reports.len(), 1);

    let receipt = drafted(&reports[0].outcome);
    let banner_path = receipt.banner.as_ref().unwrap();
    assert_eq!(banner_path, &receipt.directory.join(BANNER_FILE_NAME));
    let banner = image::open(banner_path).unwrap();
    assert_eq!((banner.width(), banner.height()), (800, 450));

    let draft = read_draft(&receipt.directory);
    assert_eq!(
        draft["screenshot"]["candidate"]["path"].as_str(),
        Some("assets/screenshots/dragon_boss.png")
    );
    assert_eq!(draft["screenshot"]["candidate"]["origin"].as_str(), Some("co-located"));
    assert_eq!(draft["screenshot"]["confidence"].as_str(), Some("match"));
    assert_eq!(draft["banner"]["width"].as_u64(), Some(800));

    // Only the feature is announced; the CI commit stays internal.
    let commits = draft["commits"].as_sequence().unwrap();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0]["subject"].as_str(), Some("add dragon boss encounter"));
    assert_eq!(
        draft["announcement"]["body"].as_str().map(str::trim_end),
        Some("New:\n- Add dragon boss encounter")
    );
}

#[tokio::test]
async fn mismatched_screenshot_falls_back_to_promotional_art() {
    let test_repo = TestRepo::new().unwrap();
    test_repo
        .commit("chore: add promo art", &[("art/sword_fight.png", png(1280, 720))])
        .unwrap();
    test_repo
        .commit(
            "feat: new sword combo",
            &[("assets/screenshots/village.png", png(1280, 720))],
        )
        .unwrap();

    let drafts = TempDir::new().unwrap();
    let report = test_repo
        .pipeline(&PressConfig::default(), drafts.path())
        .unwrap()
        .run_release("HEAD~1..HEAD")
        .await
        .unwrap();

    let draft = read_draft(&drafted(&report.outcome).directory);
    assert_eq!(
        draft["screenshot"]["candidate"]["path"].as_str(),
        Some("art/sword_fight.png")
    );
    assert_eq!(
        draft["screenshot"]["candidate"]["origin"].as_str(),
        Some("repository-fallback")
    );
    let rejected = draft["rejected_screenshots"].as_sequence().unwrap();
    assert_eq!(rejected[0]["path"].as_str(), Some("assets/screenshots/village.png"));
}

#[tokio::test]
async fn release_without_images_has_no_banner() {
    let test_repo = TestRepo::new().unwrap();
    test_repo
        .commit("fix: crash when loading a save", &[("src/save.rs", b"".to_vec())])
        .unwrap();

    let drafts = TempDir::new().unwrap();
    let report = test_repo
        .pipeline(&PressConfig::default(), drafts.path())
        .unwrap()
        .run_release("..HEAD")
        .await
        .unwrap();

    let receipt = drafted(&report.outcome);
    assert!(receipt.banner.is_none());
    assert!(!receipt.directory.join(BANNER_FILE_NAME).exists());

    let draft = read_draft(&receipt.directory);
    assert!(draft.get("banner").is_none());
    assert!(draft.get("screenshot").is_none());
    assert_eq!(draft["announcement"]["generated_by"].as_str(), Some("fallback"));
}

#[tokio::test]
async fn internal_only_release_writes_nothing() {
    let test_repo = TestRepo::new().unwrap();
    test_repo
        .commit("docs: document build steps", &[("docs/build.md", b"# Build".to_vec())])
        .unwrap();
    test_repo
        .commit("chore(deps): bump serde", &[("Cargo.lock", b"".to_vec())])
        .unwrap();

    let drafts = TempDir::new().unwrap();
    let report = test_repo
        .pipeline(&PressConfig::default(), drafts.path())
        .unwrap()
        .run_release("..HEAD")
        .await
        .unwrap();

    assert_eq!(report.outcome, ReleaseOutcome::NothingToAnnounce);
    assert_eq!(std::fs::read_dir(drafts.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn second_run_reuses_enhancement_cache() {
    let test_repo = TestRepo::new().unwrap();
    test_repo
        .commit(
            "feat: add castle level [shot: promo/castle.png]",
            &[("promo/castle.png", png(400, 225))],
        )
        .unwrap();
    std::fs::write(
        test_repo.repo_path.join(".patchnote.yaml"),
        "banner:\n  width: 320\n  height: 180\nenhancement:\n  enhanced_enabled: false\n",
    )
    .unwrap();

    let config = PressConfig::load(&test_repo.repo_path, None).unwrap();
    assert_eq!(config.banner.width, 320);

    let drafts = TempDir::new().unwrap();
    let pipeline = test_repo.pipeline(&config, drafts.path()).unwrap();

    let first = pipeline.run_release("..HEAD").await.unwrap();
    let first_draft = read_draft(&drafted(&first.outcome).directory);
    assert_eq!(first_draft["banner"]["from_cache"].as_bool(), Some(false));
    assert!(first_draft["screenshot"]["confidence"].is_null());

    let second = pipeline.run_release("..HEAD").await.unwrap();
    let second_draft = read_draft(&drafted(&second.outcome).directory);
    assert_eq!(second_draft["banner"]["from_cache"].as_bool(), Some(true));
    assert_eq!(second_draft["banner"]["width"].as_u64(), Some(320));
}
