//! 撮影ステージ
//!
//! - CapturedImages: 撮影/アップロード画像（Data URI）の順序付きリスト
//! - CameraSlot: カメラストリームの単一所有者。解放は必ず1回
//! - UploadBatch: 非同期デコード完了順に関わらず選択順で追加する
//! - CaptureStage: 上記をまとめた撮影ステージの状態

use crate::error::{Error, Result};

/// 撮影JPEGの品質（固定）
pub const CAPTURE_JPEG_QUALITY: f64 = 0.92;

/// シャッター時の触覚フィードバック（ms）
pub const HAPTIC_PULSE_MS: u32 = 50;

/// カメラ要求条件
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConstraints {
    pub facing_mode: &'static str,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            facing_mode: "environment",
            ideal_width: 1920,
            ideal_height: 1080,
        }
    }
}

/// 取得済みのカメラストリーム
pub trait CameraStream {
    /// 現在フレームをJPEGのData URIとして取得
    fn grab_jpeg(&self, quality: f64) -> Result<String>;

    /// 全トラックを停止する。所有権を消費するので二重停止は起きない
    fn stop(self);
}

/// 触覚フィードバック（非対応環境では何もしない）
pub trait Haptics {
    fn pulse(&self, ms: u32);
}

/// 触覚フィードバックなし
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn pulse(&self, _ms: u32) {}
}

/// 撮影画像リスト
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedImages {
    images: Vec<String>,
}

impl CapturedImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data_uri: String) -> usize {
        self.images.push(data_uri);
        self.images.len() - 1
    }

    pub fn extend(&mut self, data_uris: impl IntoIterator<Item = String>) {
        self.images.extend(data_uris);
    }

    /// 位置指定で削除。後続は1つ前に詰まる
    pub fn remove(&mut self, index: usize) -> Option<String> {
        if index < self.images.len() {
            Some(self.images.remove(index))
        } else {
            None
        }
    }

    /// 先頭画像（プレビュー用）
    pub fn primary(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.images
    }

    pub fn into_vec(self) -> Vec<String> {
        self.images
    }
}

enum SlotState<S> {
    Idle,
    Acquiring(u64),
    Active(S),
}

/// 取得予約の控え。install / abandon は同じ予約に対してのみ効く
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraTicket(u64);

/// カメラの単一所有スロット
///
/// 取得は非同期（getUserMedia等）を想定し、reserve → install / abandon の2段階。
/// 予約ごとに世代番号を振り、取り消された古い予約の結果は受け取らない。
pub struct CameraSlot<S: CameraStream> {
    state: SlotState<S>,
    generation: u64,
}

impl<S: CameraStream> Default for CameraSlot<S> {
    fn default() -> Self {
        Self { state: SlotState::Idle, generation: 0 }
    }
}

impl<S: CameraStream> CameraSlot<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取得を予約。取得中・使用中は CameraBusy
    pub fn reserve(&mut self) -> Result<CameraTicket> {
        match self.state {
            SlotState::Idle => {
                self.generation += 1;
                self.state = SlotState::Acquiring(self.generation);
                Ok(CameraTicket(self.generation))
            }
            _ => Err(Error::CameraBusy),
        }
    }

    /// 取得完了。予約が取り消されていた（または別の予約に替わっていた）場合は
    /// 即座に停止して false
    pub fn install(&mut self, ticket: CameraTicket, stream: S) -> bool {
        match self.state {
            SlotState::Acquiring(generation) if generation == ticket.0 => {
                self.state = SlotState::Active(stream);
                true
            }
            _ => {
                tracing::debug!(ticket = ticket.0, "stale camera acquisition stopped");
                stream.stop();
                false
            }
        }
    }

    /// 取得失敗
    pub fn abandon(&mut self, ticket: CameraTicket) {
        if matches!(self.state, SlotState::Acquiring(generation) if generation == ticket.0) {
            self.state = SlotState::Idle;
        }
    }

    pub fn stream(&self) -> Option<&S> {
        match &self.state {
            SlotState::Active(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SlotState::Active(_))
    }

    pub fn is_acquiring(&self) -> bool {
        matches!(self.state, SlotState::Acquiring(_))
    }

    /// 解放。トラックを停止した場合 true
    pub fn release(&mut self) -> bool {
        match std::mem::replace(&mut self.state, SlotState::Idle) {
            SlotState::Active(stream) => {
                stream.stop();
                true
            }
            _ => false,
        }
    }
}

impl<S: CameraStream> Drop for CameraSlot<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// アップロード1件分のデコード結果
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedUpload {
    /// 選択時の順序
    pub sequence: usize,
    pub data_uri: String,
}

/// 複数ファイルの非同期デコードを選択順に揃える
#[derive(Debug, Clone)]
pub struct UploadBatch {
    slots: Vec<Option<Option<String>>>,
}

impl UploadBatch {
    pub fn new(count: usize) -> Self {
        Self { slots: vec![None; count] }
    }

    /// デコード完了。全件揃ったら選択順のリストを返す
    pub fn complete(&mut self, sequence: usize, data_uri: String) -> Option<Vec<String>> {
        self.settle(sequence, Some(data_uri))
    }

    /// デコード失敗（その1件は捨てる）
    pub fn fail(&mut self, sequence: usize) -> Option<Vec<String>> {
        self.settle(sequence, None)
    }

    pub fn is_settled(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    fn settle(&mut self, sequence: usize, value: Option<String>) -> Option<Vec<String>> {
        let slot = self.slots.get_mut(sequence)?;
        if slot.is_some() {
            return None;
        }
        *slot = Some(value);

        if !self.is_settled() {
            return None;
        }
        Some(self.slots.iter_mut().filter_map(|s| s.take().flatten()).collect())
    }
}

/// 撮影ステージの状態
pub struct CaptureStage<S: CameraStream> {
    images: CapturedImages,
    camera: CameraSlot<S>,
    constraints: CameraConstraints,
}

impl<S: CameraStream> Default for CaptureStage<S> {
    fn default() -> Self {
        Self {
            images: CapturedImages::new(),
            camera: CameraSlot::new(),
            constraints: CameraConstraints::default(),
        }
    }
}

impl<S: CameraStream> CaptureStage<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constraints(&self) -> &CameraConstraints {
        &self.constraints
    }

    pub fn images(&self) -> &CapturedImages {
        &self.images
    }

    pub fn is_capturing(&self) -> bool {
        self.camera.is_active()
    }

    /// カメラの取得待ち
    pub fn is_starting(&self) -> bool {
        self.camera.is_acquiring()
    }

    /// 非同期取得の開始。既に取得中/使用中なら None（既存ストリームを維持）
    pub fn begin_camera(&mut self) -> Option<CameraTicket> {
        match self.camera.reserve() {
            Ok(ticket) => Some(ticket),
            Err(_) => {
                tracing::debug!("camera already started; ignoring second start");
                None
            }
        }
    }

    /// 非同期取得の完了
    pub fn camera_ready(&mut self, ticket: CameraTicket, stream: S) -> bool {
        self.camera.install(ticket, stream)
    }

    /// 非同期取得の失敗。エラーは記録のみで呼び出し元へは伝えない
    pub fn camera_failed(&mut self, ticket: CameraTicket, reason: &str) {
        tracing::warn!(reason, "camera unavailable");
        self.camera.abandon(ticket);
    }

    /// 同期的に取得できる環境向けの start camera
    pub fn start_camera<F>(&mut self, acquire: F) -> bool
    where
        F: FnOnce(&CameraConstraints) -> Result<S>,
    {
        let Some(ticket) = self.begin_camera() else {
            return self.camera.is_active();
        };
        match acquire(&self.constraints) {
            Ok(stream) => self.camera_ready(ticket, stream),
            Err(e) => {
                self.camera_failed(ticket, &e.to_string());
                false
            }
        }
    }

    /// 現在フレームを撮影して追加
    pub fn capture_frame(&mut self, haptics: &dyn Haptics) -> Result<usize> {
        let stream = self.camera.stream().ok_or(Error::CameraInactive)?;
        let data_uri = stream.grab_jpeg(CAPTURE_JPEG_QUALITY)?;
        let position = self.images.push(data_uri);
        haptics.pulse(HAPTIC_PULSE_MS);
        Ok(position)
    }

    /// デコード済みアップロードを選択順で追加
    pub fn add_uploads(&mut self, mut uploads: Vec<DecodedUpload>) {
        uploads.sort_by_key(|u| u.sequence);
        self.images.extend(uploads.into_iter().map(|u| u.data_uri));
    }

    pub fn add_images(&mut self, data_uris: Vec<String>) {
        self.images.extend(data_uris);
    }

    pub fn remove_image(&mut self, index: usize) -> Option<String> {
        self.images.remove(index)
    }

    pub fn stop_camera(&mut self) -> bool {
        self.camera.release()
    }

    /// カメラを解放してから画像リストを返す（0枚は不可）
    pub fn submit(&mut self) -> Result<Vec<String>> {
        self.camera.release();
        if self.images.is_empty() {
            return Err(Error::NoImages);
        }
        Ok(std::mem::take(&mut self.images).into_vec())
    }

    pub fn cancel(&mut self) {
        self.camera.release();
        self.images.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// 停止回数を数えるテスト用ストリーム
    struct FakeStream {
        stops: Rc<Cell<u32>>,
        frames: Rc<Cell<u32>>,
    }

    impl CameraStream for FakeStream {
        fn grab_jpeg(&self, quality: f64) -> Result<String> {
            assert_eq!(quality, CAPTURE_JPEG_QUALITY);
            self.frames.set(self.frames.get() + 1);
            Ok(format!("data:image/jpeg;base64,frame{}", self.frames.get()))
        }

        fn stop(self) {
            self.stops.set(self.stops.get() + 1);
        }
    }

    struct CountingHaptics(RefCell<Vec<u32>>);

    impl Haptics for CountingHaptics {
        fn pulse(&self, ms: u32) {
            self.0.borrow_mut().push(ms);
        }
    }

    fn fake() -> (FakeStream, Rc<Cell<u32>>) {
        let stops = Rc::new(Cell::new(0));
        let stream = FakeStream { stops: stops.clone(), frames: Rc::new(Cell::new(0)) };
        (stream, stops)
    }

    fn uri(n: u32) -> String {
        format!("data:image/jpeg;base64,img{}", n)
    }

    #[test]
    fn test_remove_shifts_later_images() {
        let mut images = CapturedImages::new();
        for n in 0..4 {
            images.push(uri(n));
        }

        assert_eq!(images.remove(1), Some(uri(1)));
        assert_eq!(images.as_slice(), &[uri(0), uri(2), uri(3)]);
        assert!(!images.as_slice().contains(&uri(1)));
        assert_eq!(images.primary(), Some(uri(0).as_str()));
        assert_eq!(images.remove(10), None);
        assert_eq!(images.len(), 3);
    }

    #[test]
    fn test_start_camera_failure_stays_inactive() {
        let mut stage: CaptureStage<FakeStream> = CaptureStage::new();
        let started = stage.start_camera(|_| Err(Error::Camera("NotAllowedError".into())));
        assert!(!started);
        assert!(!stage.is_capturing());

        // 失敗後は再試行できる
        let (stream, _) = fake();
        assert!(stage.start_camera(|_| Ok(stream)));
        assert!(stage.is_capturing());
    }

    #[test]
    fn test_second_start_is_refused() {
        let mut stage: CaptureStage<FakeStream> = CaptureStage::new();
        let (first, first_stops) = fake();
        assert!(stage.start_camera(|_| Ok(first)));

        let mut called = false;
        assert!(stage.start_camera(|_| {
            called = true;
            Err(Error::CameraBusy)
        }));
        assert!(!called);
        assert_eq!(first_stops.get(), 0);
    }

    #[test]
    fn test_capture_requires_active_stream() {
        let mut stage: CaptureStage<FakeStream> = CaptureStage::new();
        let result = stage.capture_frame(&NoHaptics);
        assert!(matches!(result, Err(Error::CameraInactive)));
    }

    #[test]
    fn test_capture_appends_and_pulses() {
        let mut stage: CaptureStage<FakeStream> = CaptureStage::new();
        let (stream, _) = fake();
        stage.start_camera(|c| {
            assert_eq!(c.facing_mode, "environment");
            Ok(stream)
        });

        let haptics = CountingHaptics(RefCell::new(Vec::new()));
        assert_eq!(stage.capture_frame(&haptics).unwrap(), 0);
        assert_eq!(stage.capture_frame(&haptics).unwrap(), 1);
        assert_eq!(stage.images().len(), 2);
        assert_eq!(*haptics.0.borrow(), vec![HAPTIC_PULSE_MS, HAPTIC_PULSE_MS]);
        assert!(stage.images().as_slice()[0].ends_with("frame1"));
    }

    #[test]
    fn test_submit_releases_camera_once() {
        let mut stage: CaptureStage<FakeStream> = CaptureStage::new();
        let (stream, stops) = fake();
        stage.start_camera(|_| Ok(stream));
        stage.capture_frame(&NoHaptics).unwrap();

        let images = stage.submit().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(stops.get(), 1);
        assert!(!stage.is_capturing());

        // 以降の停止経路でも二重停止しない
        assert!(!stage.stop_camera());
        stage.cancel();
        drop(stage);
        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn test_submit_without_images_rejected() {
        let mut stage: CaptureStage<FakeStream> = CaptureStage::new();
        let (stream, stops) = fake();
        stage.start_camera(|_| Ok(stream));
        assert!(matches!(stage.submit(), Err(Error::NoImages)));
        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn test_cancel_and_stop_release_once() {
        let (stream, stops) = fake();
        let mut stage: CaptureStage<FakeStream> = CaptureStage::new();
        stage.start_camera(|_| Ok(stream));
        assert!(stage.stop_camera());
        assert!(!stage.stop_camera());
        assert_eq!(stops.get(), 1);

        let (stream, stops) = fake();
        stage.start_camera(|_| Ok(stream));
        stage.capture_frame(&NoHaptics).unwrap();
        stage.cancel();
        assert_eq!(stops.get(), 1);
        assert!(stage.images().is_empty());
    }

    #[test]
    fn test_drop_releases_camera() {
        let (stream, stops) = fake();
        {
            let mut stage: CaptureStage<FakeStream> = CaptureStage::new();
            stage.start_camera(|_| Ok(stream));
        }
        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn test_install_after_release_stops_immediately() {
        let mut slot: CameraSlot<FakeStream> = CameraSlot::new();
        let ticket = slot.reserve().unwrap();
        assert!(slot.is_acquiring());
        assert!(matches!(slot.reserve(), Err(Error::CameraBusy)));

        // 取得中にキャンセルされた
        assert!(!slot.release());
        assert!(!slot.is_acquiring());
        let (stream, stops) = fake();
        assert!(!slot.install(ticket, stream));
        assert_eq!(stops.get(), 1);
        assert!(!slot.is_active());
    }

    #[test]
    fn test_stale_acquisition_does_not_take_new_reservation() {
        let mut slot: CameraSlot<FakeStream> = CameraSlot::new();
        let first = slot.reserve().unwrap();
        slot.release();
        let second = slot.reserve().unwrap();
        assert_ne!(first, second);

        // 1回目の取得結果が遅れて届く
        let (old, old_stops) = fake();
        assert!(!slot.install(first, old));
        assert_eq!(old_stops.get(), 1);
        assert!(slot.is_acquiring());

        // 古い予約の失敗通知は新しい予約を消さない
        slot.abandon(first);
        assert!(slot.is_acquiring());

        let (current, current_stops) = fake();
        assert!(slot.install(second, current));
        assert!(slot.is_active());
        assert_eq!(current_stops.get(), 0);
    }

    #[test]
    fn test_async_start_reports_starting() {
        let mut stage: CaptureStage<FakeStream> = CaptureStage::new();
        let ticket = stage.begin_camera().unwrap();
        assert!(stage.is_starting());
        assert!(stage.begin_camera().is_none());

        stage.camera_failed(ticket, "NotAllowedError");
        assert!(!stage.is_starting());
        assert!(!stage.is_capturing());

        let ticket = stage.begin_camera().unwrap();
        let (stream, _) = fake();
        assert!(stage.camera_ready(ticket, stream));
        assert!(stage.is_capturing());
        assert!(!stage.is_starting());
    }

    #[test]
    fn test_upload_batch_preserves_selection_order() {
        let mut batch = UploadBatch::new(3);
        assert_eq!(batch.complete(2, uri(2)), None);
        assert_eq!(batch.complete(0, uri(0)), None);
        assert_eq!(batch.complete(0, uri(9)), None);
        assert_eq!(batch.complete(1, uri(1)), Some(vec![uri(0), uri(1), uri(2)]));
    }

    #[test]
    fn test_upload_batch_skips_failed() {
        let mut batch = UploadBatch::new(2);
        assert_eq!(batch.fail(0), None);
        assert_eq!(batch.complete(1, uri(1)), Some(vec![uri(1)]));
        assert_eq!(batch.complete(5, uri(5)), None);
    }

    #[test]
    fn test_add_uploads_sorted_by_sequence() {
        let mut stage: CaptureStage<FakeStream> = CaptureStage::new();
        stage.add_images(vec![uri(0)]);
        stage.add_uploads(vec![
            DecodedUpload { sequence: 1, data_uri: uri(2) },
            DecodedUpload { sequence: 0, data_uri: uri(1) },
        ]);
        assert_eq!(stage.images().as_slice(), &[uri(0), uri(1), uri(2)]);
    }
}
