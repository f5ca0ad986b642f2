mod engine;
mod game;

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    console, HtmlCanvasElement, KeyboardEvent, Request, RequestInit, RequestMode, Response,
    WebGlRenderingContext, Window,
};

use crate::engine::mesh::Mesh;
use crate::engine::renderer::Renderer;
use crate::game::challenge::ChallengeScene;
use crate::game::free_roam::{FreeRoamScene, InputState};
use crate::game::handoff::{self, SceneHandoff};
use crate::game::world::{Direction, Status};
use crate::game::{AppConfig, Game, ModelConfig};

thread_local! {
    static GAME: RefCell<Option<Game>> = RefCell::new(None);
    static FREE_ROAM: RefCell<Option<FreeRoamScene>> = RefCell::new(None);
    static CHALLENGE: RefCell<Option<ChallengeScene>> = RefCell::new(None);
    static INPUT: RefCell<InputState> = RefCell::new(InputState::default());
}

fn setup_renderer() -> Result<Renderer, JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    let document = window.document().ok_or("No document")?;
    let canvas = document
        .get_element_by_id("canvas")
        .ok_or("No canvas")?
        .dyn_into::<HtmlCanvasElement>()?;

    let gl = canvas
        .get_context("webgl")?
        .ok_or("No WebGL")?
        .dyn_into::<WebGlRenderingContext>()?;

    Renderer::new(gl)
}

async fn fetch_config(window: &Window) -> Option<AppConfig> {
    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::Cors);

    let request = Request::new_with_str_and_init("/assets/config.json", &opts).ok()?;
    let resp_value = JsFuture::from(window.fetch_with_request(&request)).await.ok()?;
    let resp: Response = resp_value.dyn_into().ok()?;
    if !resp.ok() {
        return None;
    }
    let json = JsFuture::from(resp.json().ok()?).await.ok()?;
    serde_wasm_bindgen::from_value(json).ok()
}

async fn fetch_player_mesh(window: &Window, path: &str) -> Option<Mesh> {
    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::Cors);

    let request = Request::new_with_str_and_init(path, &opts).ok()?;
    let resp_value = JsFuture::from(window.fetch_with_request(&request)).await.ok()?;
    let resp: Response = resp_value.dyn_into().ok()?;
    if !resp.ok() {
        return None;
    }
    let buffer = JsFuture::from(resp.array_buffer().ok()?).await.ok()?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();

    match Mesh::from_gltf(&bytes) {
        Ok(mesh) => Some(mesh),
        Err(err) => {
            console::warn_1(&format!("Player model failed to parse: {err}").into());
            None
        }
    }
}

/// Fetches config and the player model it points at; either may be
/// absent, gameplay does not wait on them being real.
async fn load_assets(window: &Window) -> (Option<Mesh>, Option<AppConfig>) {
    let config = fetch_config(window).await;
    let model_path = config
        .as_ref()
        .map(|c| c.player_model.path.clone())
        .unwrap_or_else(|| ModelConfig::default().path);

    let player_mesh = fetch_player_mesh(window, &model_path).await;
    if player_mesh.is_none() {
        console::warn_1(&"Player model unavailable, using placeholder".into());
    }
    (player_mesh, config)
}

fn request_animation_frame(f: &Closure<dyn FnMut()>) {
    web_sys::window()
        .expect("no window")
        .request_animation_frame(f.as_ref().unchecked_ref())
        .expect("requestAnimationFrame failed");
}

// ------------------- Endless crossing -------------------

#[wasm_bindgen]
pub async fn init_game() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    let renderer = setup_renderer()?;
    let (player_mesh, config) = load_assets(&window).await;

    let game = Game::new(renderer, player_mesh, config);
    GAME.with(|slot| *slot.borrow_mut() = Some(game));

    let closure = Closure::wrap(Box::new(move |event: KeyboardEvent| {
        GAME.with(|slot| {
            if let Some(game) = slot.borrow_mut().as_mut() {
                let handled = match event.key().as_str() {
                    "w" | "W" | "ArrowUp" => {
                        game.queue_move(Direction::Forward);
                        true
                    }
                    "s" | "S" | "ArrowDown" => {
                        game.queue_move(Direction::Backward);
                        true
                    }
                    "a" | "A" | "ArrowLeft" => {
                        game.queue_move(Direction::Left);
                        true
                    }
                    "d" | "D" | "ArrowRight" => {
                        game.queue_move(Direction::Right);
                        true
                    }
                    "r" | "R" => {
                        game.restart();
                        true
                    }
                    _ => false,
                };
                if handled {
                    event.prevent_default();
                }
            }
        });
    }) as Box<dyn FnMut(_)>);
    window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
    closure.forget();

    if let Some(document) = window.document() {
        if let Some(retry) = document.get_element_by_id("retry") {
            let on_retry = Closure::wrap(Box::new(move || {
                GAME.with(|slot| {
                    if let Some(game) = slot.borrow_mut().as_mut() {
                        game.restart();
                    }
                });
            }) as Box<dyn FnMut()>);
            retry.add_event_listener_with_callback("click", on_retry.as_ref().unchecked_ref())?;
            on_retry.forget();
        }
    }

    let f = Rc::new(RefCell::new(None));
    let g = f.clone();

    *g.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        GAME.with(|slot| {
            if let Some(game) = slot.borrow_mut().as_mut() {
                game.update();
                game.render();
                update_ui(game.world.score(), game.world.status);
            }
        });
        request_animation_frame(f.borrow().as_ref().unwrap());
    }) as Box<dyn FnMut()>));

    request_animation_frame(g.borrow().as_ref().unwrap());

    Ok(())
}

fn update_ui(score: i32, status: Status) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    if let Some(el) = document.get_element_by_id("score") {
        el.set_inner_html(&score.to_string());
    }
    if let Some(el) = document.get_element_by_id("result-container") {
        let style = match status {
            Status::GameOver { .. } => "visibility: visible;",
            Status::Playing => "visibility: hidden;",
        };
        el.set_attribute("style", style).ok();
    }
    if let Status::GameOver { final_score } = status {
        if let Some(el) = document.get_element_by_id("final-score") {
            el.set_inner_html(&final_score.to_string());
        }
    }
}

#[wasm_bindgen]
pub fn queue_forward() {
    queue_from_button(Direction::Forward);
}

#[wasm_bindgen]
pub fn queue_backward() {
    queue_from_button(Direction::Backward);
}

#[wasm_bindgen]
pub fn queue_left() {
    queue_from_button(Direction::Left);
}

#[wasm_bindgen]
pub fn queue_right() {
    queue_from_button(Direction::Right);
}

#[wasm_bindgen]
pub fn restart_game() {
    GAME.with(|slot| {
        if let Some(game) = slot.borrow_mut().as_mut() {
            game.restart();
        }
    });
}

fn queue_from_button(direction: Direction) {
    GAME.with(|slot| {
        if let Some(game) = slot.borrow_mut().as_mut() {
            game.queue_move(direction);
        }
    });
}

// ------------------- Free roam hub -------------------

#[wasm_bindgen]
pub async fn init_free_roam() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    let renderer = setup_renderer()?;
    let (player_mesh, config) = load_assets(&window).await;

    let scene = FreeRoamScene::new(renderer, player_mesh, config);
    FREE_ROAM.with(|slot| *slot.borrow_mut() = Some(scene));

    attach_movement_keys(&window)?;

    let f = Rc::new(RefCell::new(None));
    let g = f.clone();

    *g.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        let leaving = FREE_ROAM.with(|slot| {
            let mut slot = slot.borrow_mut();
            let Some(scene) = slot.as_mut() else {
                return true;
            };
            let input = INPUT.with(|i| *i.borrow());
            scene.update(&input);
            scene.render();
            update_reports_ui(scene.roam.collected(), scene.roam.total());

            if scene.roam.transition.take().is_some() {
                let carried = load_handoff();
                store_handoff(&SceneHandoff {
                    reports_collected: carried.reports_collected + scene.roam.collected(),
                    total_reports: carried.total_reports,
                    time_ms_left: carried.time_ms_left,
                });
                navigate("/challenge.html");
                return true;
            }
            false
        });
        if !leaving {
            request_animation_frame(f.borrow().as_ref().unwrap());
        }
    }) as Box<dyn FnMut()>));

    request_animation_frame(g.borrow().as_ref().unwrap());

    Ok(())
}

// ------------------- Timed challenge -------------------

#[wasm_bindgen]
pub async fn init_challenge() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    let renderer = setup_renderer()?;
    let (player_mesh, config) = load_assets(&window).await;

    let scene = ChallengeScene::new(renderer, player_mesh, config, load_handoff());
    CHALLENGE.with(|slot| *slot.borrow_mut() = Some(scene));

    attach_movement_keys(&window)?;

    let f = Rc::new(RefCell::new(None));
    let g = f.clone();

    *g.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        let leaving = CHALLENGE.with(|slot| {
            let mut slot = slot.borrow_mut();
            let Some(scene) = slot.as_mut() else {
                return true;
            };
            let input = INPUT.with(|i| *i.borrow());
            scene.update(&input);
            scene.render();
            update_challenge_ui(
                scene.challenge.time_ms_left,
                scene.challenge.collected_total(),
                scene.challenge.total_reports,
            );

            if scene.challenge.exit.take().is_some() {
                store_handoff(&scene.challenge.handoff());
                navigate("/");
                return true;
            }
            false
        });
        if !leaving {
            request_animation_frame(f.borrow().as_ref().unwrap());
        }
    }) as Box<dyn FnMut()>));

    request_animation_frame(g.borrow().as_ref().unwrap());

    Ok(())
}

// ------------------- Shared glue -------------------

fn attach_movement_keys(window: &Window) -> Result<(), JsValue> {
    let down = Closure::wrap(Box::new(move |event: KeyboardEvent| {
        INPUT.with(|input| {
            let mut input = input.borrow_mut();
            match event.key().as_str() {
                "w" | "W" | "ArrowUp" => input.forward = true,
                "s" | "S" | "ArrowDown" => input.backward = true,
                "a" | "A" | "ArrowLeft" => input.left = true,
                "d" | "D" | "ArrowRight" => input.right = true,
                " " => {
                    input.run = !input.run;
                    event.prevent_default();
                }
                _ => {}
            }
        });
    }) as Box<dyn FnMut(_)>);
    window.add_event_listener_with_callback("keydown", down.as_ref().unchecked_ref())?;
    down.forget();

    let up = Closure::wrap(Box::new(move |event: KeyboardEvent| {
        INPUT.with(|input| {
            let mut input = input.borrow_mut();
            match event.key().as_str() {
                "w" | "W" | "ArrowUp" => input.forward = false,
                "s" | "S" | "ArrowDown" => input.backward = false,
                "a" | "A" | "ArrowLeft" => input.left = false,
                "d" | "D" | "ArrowRight" => input.right = false,
                _ => {}
            }
        });
    }) as Box<dyn FnMut(_)>);
    window.add_event_listener_with_callback("keyup", up.as_ref().unchecked_ref())?;
    up.forget();

    Ok(())
}

fn update_reports_ui(collected: u32, total: u32) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    if let Some(el) = document.get_element_by_id("reports") {
        el.set_inner_html(&format!("{collected} / {total}"));
    }
}

fn update_challenge_ui(time_ms_left: f64, collected: u32, total: u32) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    if let Some(el) = document.get_element_by_id("timer") {
        let seconds = (time_ms_left / 1000.0).ceil() as i64;
        el.set_inner_html(&seconds.to_string());
    }
    if let Some(el) = document.get_element_by_id("reports") {
        el.set_inner_html(&format!("{collected} / {total}"));
    }
}

fn load_handoff() -> SceneHandoff {
    let storage = web_sys::window().and_then(|w| w.local_storage().ok()).flatten();
    match storage.and_then(|s| s.get_item(handoff::STORAGE_KEY).ok()).flatten() {
        Some(raw) => SceneHandoff::from_json(&raw),
        None => SceneHandoff::default(),
    }
}

fn store_handoff(record: &SceneHandoff) {
    let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok()).flatten() else {
        console::warn_1(&"localStorage unavailable, progress not saved".into());
        return;
    };
    if storage.set_item(handoff::STORAGE_KEY, &record.to_json()).is_err() {
        console::warn_1(&"Failed to persist scene handoff".into());
    }
}

fn navigate(href: &str) {
    if let Some(window) = web_sys::window() {
        if window.location().set_href(href).is_err() {
            console::error_1(&format!("Navigation to {href} failed").into());
        }
    }
}
