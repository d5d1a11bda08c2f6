//! 撮影ステージ
//!
//! カメラ撮影とファイルアップロードで画像を集め、選択順のリストを渡す。
//! カメラは画面を離れるすべての経路（送信・停止・アンマウント）で解放される。

use crate::camera::{describe, WebCamera, WebHaptics};
use board_scan_common::capture::{CameraStream, CaptureStage, UploadBatch};
use futures::channel::oneshot;
use leptos::html::{Input, Video};
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::{File, FileList, FileReader, ProgressEvent};

type WebCaptureStage = CaptureStage<WebCamera>;

#[component]
pub fn CaptureScreen(on_submit: Callback<Vec<String>>) -> impl IntoView {
    let stage = RwSignal::new_local(WebCaptureStage::new());
    let video_ref = NodeRef::<Video>::new();
    let file_ref = NodeRef::<Input>::new();
    let (notice, set_notice) = signal(None::<String>);

    on_cleanup(move || {
        stage.try_update(|s| s.stop_camera());
    });

    let is_capturing = move || stage.with(|s| s.is_capturing());
    let is_starting = move || stage.with(|s| s.is_starting());
    let image_count = move || stage.with(|s| s.images().len());

    let start_camera = move |_| {
        let Some(ticket) = stage.try_update(|s| s.begin_camera()).flatten() else {
            return;
        };
        set_notice.set(None);
        let constraints = stage.with_untracked(|s| s.constraints().clone());

        spawn_local(async move {
            let Some(video) = video_ref.get_untracked() else {
                stage.try_update(|s| s.camera_failed(ticket, "video element missing"));
                return;
            };
            match WebCamera::open(&constraints, video).await {
                Ok(camera) => {
                    let mut pending = Some(camera);
                    stage.try_update(|s| {
                        if let Some(camera) = pending.take() {
                            s.camera_ready(ticket, camera);
                        }
                    });
                    // 取得中に画面が閉じられた
                    if let Some(camera) = pending {
                        camera.stop();
                    }
                }
                Err(reason) => {
                    gloo::console::warn!(format!("camera unavailable: {}", reason));
                    set_notice.try_set(Some("カメラを利用できません。写真を選択してください".to_string()));
                    stage.try_update(|s| s.camera_failed(ticket, &reason));
                }
            }
        });
    };

    let capture_frame = move |_| {
        if let Some(Err(e)) = stage.try_update(|s| s.capture_frame(&WebHaptics)) {
            gloo::console::warn!(format!("capture failed: {}", e));
            set_notice.set(Some(e.to_string()));
        }
    };

    let stop_camera = move |_| {
        stage.update(|s| {
            s.stop_camera();
        });
    };

    let on_files = move |_| {
        let Some(input) = file_ref.get_untracked() else {
            return;
        };
        if let Some(files) = input.files() {
            read_files(files, move |images| {
                stage.try_update(|s| s.add_images(images));
            });
        }
        input.set_value("");
    };

    let submit = move |_| match stage.try_update(|s| s.submit()) {
        Some(Ok(images)) => on_submit.run(images),
        Some(Err(e)) => set_notice.set(Some(e.to_string())),
        None => {}
    };

    view! {
        <div class="capture-stage">
            <div class=move || if is_capturing() { "camera-view active" } else { "camera-view" }>
                <video node_ref=video_ref autoplay=true playsinline=true muted=true />
            </div>

            <Show when=move || notice.get().is_some()>
                <p class="notice">{move || notice.get().unwrap_or_default()}</p>
            </Show>

            <div class="capture-controls">
                <Show
                    when=is_capturing
                    fallback=move || view! {
                        <button class="btn btn-secondary" disabled=is_starting on:click=start_camera>
                            {move || if is_starting() { "起動中..." } else { "📷 カメラを起動" }}
                        </button>
                    }
                >
                    <button class="btn btn-primary shutter" on:click=capture_frame>"撮影"</button>
                    <button class="btn btn-tertiary" on:click=stop_camera>"カメラを停止"</button>
                </Show>

                <label class="btn btn-secondary">
                    "写真を選択"
                    <input
                        node_ref=file_ref
                        class="hidden"
                        type="file"
                        accept="image/*"
                        multiple=true
                        on:change=on_files
                    />
                </label>
            </div>

            <div class="photo-strip">
                {move || {
                    stage
                        .with(|s| s.images().as_slice().to_vec())
                        .into_iter()
                        .enumerate()
                        .map(|(index, src)| view! {
                            <div class=if index == 0 { "thumb primary" } else { "thumb" }>
                                <img src=src alt=format!("photo {}", index + 1) />
                                <button
                                    class="thumb-remove"
                                    on:click=move |_| {
                                        stage.update(|s| {
                                            s.remove_image(index);
                                        });
                                    }
                                >
                                    "×"
                                </button>
                            </div>
                        })
                        .collect_view()
                }}
            </div>

            <button class="btn btn-primary" disabled=move || image_count() == 0 on:click=submit>
                {move || format!("解析する ({}枚)", image_count())}
            </button>
        </div>
    }
}

/// 各ファイルを並行して読み込み、全件揃ったら選択順で渡す
fn read_files<F>(files: FileList, on_ready: F)
where
    F: Fn(Vec<String>) + 'static,
{
    let count = files.length() as usize;
    if count == 0 {
        return;
    }
    let batch = Rc::new(RefCell::new(UploadBatch::new(count)));
    let on_ready = Rc::new(on_ready);

    for sequence in 0..count {
        let file = files.get(sequence as u32);
        let batch = batch.clone();
        let on_ready = on_ready.clone();

        spawn_local(async move {
            let decoded = match file {
                Some(file) => read_as_data_url(&file).await,
                None => Err("file missing".to_string()),
            };
            let settled = match decoded {
                Ok(data_uri) => batch.borrow_mut().complete(sequence, data_uri),
                Err(e) => {
                    gloo::console::warn!(format!("upload skipped: {}", e));
                    batch.borrow_mut().fail(sequence)
                }
            };
            if let Some(images) = settled {
                on_ready(images);
            }
        });
    }
}

type Reply = Rc<RefCell<Option<oneshot::Sender<Result<String, String>>>>>;

fn reply(tx: &Reply, value: Result<String, String>) {
    if let Some(tx) = tx.borrow_mut().take() {
        let _ = tx.send(value);
    }
}

async fn read_as_data_url(file: &File) -> Result<String, String> {
    let reader = FileReader::new().map_err(describe)?;
    let (tx, rx) = oneshot::channel();
    let tx: Reply = Rc::new(RefCell::new(Some(tx)));

    let onload = {
        let reader = reader.clone();
        let tx = tx.clone();
        Closure::wrap(Box::new(move |_: ProgressEvent| {
            let result = reader
                .result()
                .ok()
                .and_then(|r| r.as_string())
                .ok_or_else(|| "unreadable file".to_string());
            reply(&tx, result);
        }) as Box<dyn FnMut(_)>)
    };
    let onerror = {
        let tx = tx.clone();
        Closure::wrap(Box::new(move |_: ProgressEvent| {
            reply(&tx, Err("read failed".to_string()));
        }) as Box<dyn FnMut(_)>)
    };

    reader.set_onload(Some(onload.as_ref().unchecked_ref()));
    reader.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    reader.read_as_data_url(file).map_err(describe)?;

    let result = rx.await.unwrap_or_else(|_| Err("read cancelled".to_string()));
    reader.set_onload(None);
    reader.set_onerror(None);
    result
}
