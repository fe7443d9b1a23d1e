use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eframe::{egui, Frame};
use egui::Context;

use log::{info, warn};
use reqwest::blocking::Client;
use reqwest::Result;
use story_gen_core::api::{FavoriteBody, GenerationReply, PoemBody, StoryBody};
use story_gen_core::config::AppConfig;
use story_gen_core::export::export_text;
use story_gen_core::model::backend::ModelStatus;
use story_gen_core::model::prompt::{add_keyword, POEM_QUICK_KEYWORDS, STORY_QUICK_KEYWORDS};
use story_gen_core::model::request::{
    Emotion, Genre, Kind, PoemStyle, Rhyme, WritingStyle, TEMPERATURE_RANGE,
};
use story_gen_core::store::{Collection, Entry};

/// Fonts tried in order to render Chinese text.
const CJK_FONT_PATHS: [&str; 8] = [
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/wenquanyi/wqy-microhei/wqy-microhei.ttc",
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/STHeiti Light.ttc",
    "C:\\Windows\\Fonts\\msyh.ttc",
    "C:\\Windows\\Fonts\\simhei.ttf",
];

/// REST context holding a reusable blocking HTTP client.
struct RESTContext {
    client: Client,
    base_url: String,
}

impl RESTContext {
    /// Creates a new REST context.
    ///
    /// Generation can take long on a slow model host: only the connection is
    /// bounded, not the whole request.
    fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(None::<Duration>)
            .build()?;
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Sends a GET request to `/v1/model`.
    fn get_model(&self) -> Result<ModelStatus> {
        self.client
            .get(self.url("model"))
            .send()?
            .error_for_status()?
            .json()
    }

    /// Sends a POST request to `/v1/story`.
    fn post_story(&self, body: &StoryBody) -> Result<GenerationReply> {
        self.client
            .post(self.url("story"))
            .json(body)
            .send()?
            .error_for_status()?
            .json()
    }

    /// Sends a POST request to `/v1/poem`.
    fn post_poem(&self, body: &PoemBody) -> Result<GenerationReply> {
        self.client
            .post(self.url("poem"))
            .json(body)
            .send()?
            .error_for_status()?
            .json()
    }

    /// Sends a GET request to `/v1/history` or `/v1/favorites`, reloading from disk.
    fn get_entries(&self, collection: Collection) -> Result<Vec<Entry>> {
        self.client
            .get(self.url(collection_path(collection)))
            .query(&[("refresh", true)])
            .send()?
            .error_for_status()?
            .json()
    }

    /// Sends a DELETE request to `/v1/history`.
    fn delete_history(&self) -> Result<Vec<Entry>> {
        self.client
            .delete(self.url("history"))
            .send()?
            .error_for_status()?
            .json()
    }

    /// Sends a POST request to `/v1/favorites`.
    fn post_favorite(&self, body: &FavoriteBody) -> Result<Entry> {
        self.client
            .post(self.url("favorites"))
            .json(body)
            .send()?
            .error_for_status()?
            .json()
    }

    /// Sends a DELETE request to `/v1/favorites/{index}`.
    fn delete_favorite(&self, index: usize) -> Result<Vec<Entry>> {
        self.client
            .delete(self.url(&format!("favorites/{index}")))
            .send()?
            .error_for_status()?
            .json()
    }
}

fn collection_path(collection: Collection) -> &'static str {
    match collection {
        Collection::History => "history",
        Collection::Favorites => "favorites",
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tab {
    Story,
    Poem,
    History,
    Favorites,
}

/// Story tab inputs.
struct StoryForm {
    keywords: String,
    genre: Genre,
    writing_style: Option<WritingStyle>,
    character: String,
    max_length: u32,
    temperature: f32,
}

impl Default for StoryForm {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            genre: Genre::default(),
            writing_style: None,
            character: String::new(),
            max_length: 500,
            temperature: 0.7,
        }
    }
}

impl StoryForm {
    fn body(&self) -> StoryBody {
        let character = self.character.trim();
        StoryBody {
            keywords: self.keywords.clone(),
            genre: self.genre,
            writing_style: self.writing_style,
            character: (!character.is_empty()).then(|| character.to_owned()),
            max_length: Some(self.max_length),
            temperature: Some(self.temperature),
        }
    }
}

/// Poem tab inputs.
struct PoemForm {
    keywords: String,
    style: PoemStyle,
    rhyme: Rhyme,
    emotion: Option<Emotion>,
    max_length: u32,
    temperature: f32,
}

impl Default for PoemForm {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            style: PoemStyle::default(),
            rhyme: Rhyme::default(),
            emotion: None,
            max_length: 100,
            temperature: 0.8,
        }
    }
}

impl PoemForm {
    fn body(&self) -> PoemBody {
        PoemBody {
            keywords: self.keywords.clone(),
            style: self.style,
            rhyme: Some(self.rhyme),
            emotion: self.emotion,
            max_length: Some(self.max_length),
            temperature: Some(self.temperature),
        }
    }
}

/// Global UI state (MUST persist between frames in egui).
struct CreatorUI {
    rest: RESTContext,
    export_dir: PathBuf,
    tab: Tab,

    story: StoryForm,
    poem: PoemForm,

    result: String,
    result_kind: Option<Kind>,
    status: String,
    model: Option<ModelStatus>,

    history: Vec<Entry>,
    favorites: Vec<Entry>,
}

impl CreatorUI {
    /// Initializes the UI from the shared configuration file.
    fn new(ctx: &Context) -> Result<Self> {
        install_cjk_font(ctx);

        let config = AppConfig::load_or_init(AppConfig::default_path()).unwrap_or_else(|e| {
            warn!("cannot load configuration, using defaults: {e}");
            AppConfig::default()
        });

        let mut app = Self {
            rest: RESTContext::new(config.server.base_url())?,
            export_dir: config.export_dir(),
            tab: Tab::Story,
            story: StoryForm::default(),
            poem: PoemForm::default(),
            result: String::new(),
            result_kind: None,
            status: String::new(),
            model: None,
            history: Vec::new(),
            favorites: Vec::new(),
        };
        app.get_model();
        app.refresh(Collection::History);
        app.refresh(Collection::Favorites);
        Ok(app)
    }

    /// Performs the model status request.
    fn get_model(&mut self) {
        match self.rest.get_model() {
            Ok(status) => self.model = Some(status),
            Err(e) => self.status = format!("Error: {e}"),
        }
    }

    /// Performs the generation request of the current tab.
    fn generate(&mut self) {
        let reply = match self.tab {
            Tab::Story => self.rest.post_story(&self.story.body()),
            Tab::Poem => self.rest.post_poem(&self.poem.body()),
            Tab::History | Tab::Favorites => return,
        };
        match reply {
            Ok(reply) => {
                self.result = reply.content;
                self.result_kind = Some(reply.kind);
                self.status = format!("{}生成完成", reply.kind);
                self.refresh(Collection::History);
            }
            Err(e) => self.status = format!("Error: {e}"),
        }
    }

    fn refresh(&mut self, collection: Collection) {
        match self.rest.get_entries(collection) {
            Ok(entries) => self.set_entries(collection, entries),
            Err(e) => self.status = format!("Error: {e}"),
        }
    }

    fn set_entries(&mut self, collection: Collection, entries: Vec<Entry>) {
        match collection {
            Collection::History => self.history = entries,
            Collection::Favorites => self.favorites = entries,
        }
    }

    fn clear_history(&mut self) {
        match self.rest.delete_history() {
            Ok(entries) => {
                self.history = entries;
                self.status = "历史记录已清空".to_owned();
            }
            Err(e) => self.status = format!("Error: {e}"),
        }
    }

    fn add_favorite(&mut self) {
        if self.result.trim().is_empty() {
            self.status = "请先生成内容再收藏".to_owned();
            return;
        }
        let body = FavoriteBody { content: self.result.clone(), kind: self.result_kind };
        match self.rest.post_favorite(&body) {
            Ok(entry) => {
                self.status = format!("已收藏: {}", entry.title);
                self.favorites.push(entry);
            }
            Err(e) => self.status = format!("Error: {e}"),
        }
    }

    fn remove_favorite(&mut self, index: usize) {
        match self.rest.delete_favorite(index) {
            Ok(entries) => self.favorites = entries,
            Err(e) => self.status = format!("Error: {e}"),
        }
    }

    fn export(&mut self) {
        self.status = match export_text(&self.export_dir, &self.result) {
            Ok(Some(path)) => format!("已导出到 {}", path.display()),
            Ok(None) => "没有可导出的内容".to_owned(),
            Err(e) => format!("Error: {e}"),
        };
    }

    fn load(&mut self, entry: &Entry) {
        self.result = entry.content.clone();
        self.result_kind = Some(entry.kind);
    }

    fn story_tab(&mut self, ui: &mut egui::Ui) {
        keywords_row(ui, &mut self.story.keywords, &STORY_QUICK_KEYWORDS);

        egui::Grid::new("story_grid")
            .num_columns(2)
            .spacing([20.0, 6.0])
            .striped(true)
            .show(ui, |ui| {
                ui.label("故事类型");
                labelled_combo(ui, "genre", &mut self.story.genre, Genre::ALL, Genre::label);
                ui.end_row();

                ui.label("写作风格");
                optional_combo(ui, "writing_style", &mut self.story.writing_style, WritingStyle::ALL, WritingStyle::label);
                ui.end_row();

                ui.label("主要角色");
                ui.text_edit_singleline(&mut self.story.character);
                ui.end_row();

                ui.label("最大长度");
                ui.add(egui::Slider::new(&mut self.story.max_length, 100..=2000));
                ui.end_row();

                ui.label("创意程度");
                ui.add(egui::Slider::new(&mut self.story.temperature, TEMPERATURE_RANGE).step_by(0.1));
                ui.end_row();
            });
    }

    fn poem_tab(&mut self, ui: &mut egui::Ui) {
        keywords_row(ui, &mut self.poem.keywords, &POEM_QUICK_KEYWORDS);

        egui::Grid::new("poem_grid")
            .num_columns(2)
            .spacing([20.0, 6.0])
            .striped(true)
            .show(ui, |ui| {
                ui.label("诗歌体裁");
                labelled_combo(ui, "poem_style", &mut self.poem.style, PoemStyle::ALL, PoemStyle::label);
                ui.end_row();

                ui.label("押韵方式");
                labelled_combo(ui, "rhyme", &mut self.poem.rhyme, Rhyme::ALL, Rhyme::label);
                ui.end_row();

                ui.label("情感基调");
                optional_combo(ui, "emotion", &mut self.poem.emotion, Emotion::ALL, Emotion::label);
                ui.end_row();

                ui.label("最大长度");
                ui.add(egui::Slider::new(&mut self.poem.max_length, 20..=400));
                ui.end_row();

                ui.label("创意程度");
                ui.add(egui::Slider::new(&mut self.poem.temperature, TEMPERATURE_RANGE).step_by(0.1));
                ui.end_row();
            });
    }

    fn history_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("刷新").clicked() {
                self.refresh(Collection::History);
            }
            if ui.button("清空历史").clicked() {
                self.clear_history();
            }
        });

        let mut selected = None;
        egui::ScrollArea::vertical().id_salt("history").max_height(200.0).show(ui, |ui| {
            for (index, entry) in self.history.iter().enumerate().rev() {
                ui.horizontal(|ui| {
                    if ui.button("载入").clicked() {
                        selected = Some(index);
                    }
                    ui.label(format!("{} [{}] {}", entry.title, entry.genre_or_style().unwrap_or("-"), preview(&entry.content)));
                });
            }
        });
        if let Some(entry) = selected.and_then(|index| self.history.get(index).cloned()) {
            self.load(&entry);
        }
    }

    fn favorites_tab(&mut self, ui: &mut egui::Ui) {
        if ui.button("刷新").clicked() {
            self.refresh(Collection::Favorites);
        }

        let mut selected = None;
        let mut removed = None;
        egui::ScrollArea::vertical().id_salt("favorites").max_height(200.0).show(ui, |ui| {
            for (index, entry) in self.favorites.iter().enumerate() {
                ui.horizontal(|ui| {
                    if ui.button("载入").clicked() {
                        selected = Some(index);
                    }
                    if ui.button("删除").clicked() {
                        removed = Some(index);
                    }
                    ui.label(format!("{} ({}) {}", entry.title, entry.kind, preview(&entry.content)));
                });
            }
        });
        if let Some(entry) = selected.and_then(|index| self.favorites.get(index).cloned()) {
            self.load(&entry);
        }
        if let Some(index) = removed {
            self.remove_favorite(index);
        }
    }

    fn result_pane(&mut self, ctx: &Context, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("收藏").clicked() {
                self.add_favorite();
            }
            if ui.button("导出").clicked() {
                self.export();
            }
            if ui.button("复制").clicked() {
                if self.result.is_empty() {
                    self.status = "没有可复制的内容".to_owned();
                } else {
                    ctx.copy_text(self.result.clone());
                    self.status = "已复制到剪贴板".to_owned();
                }
            }
            if ui.button("清空").clicked() {
                self.result.clear();
                self.result_kind = None;
            }
        });

        egui::ScrollArea::vertical().id_salt("result").show(ui, |ui| {
            ui.add(
                egui::TextEdit::multiline(&mut self.result)
                    .desired_rows(12)
                    .desired_width(f32::INFINITY),
            );
        });
    }
}

impl eframe::App for CreatorUI {
    /// UI update loop (called every frame).
    fn update(&mut self, ctx: &Context, _: &mut Frame) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match &self.model {
                    Some(ModelStatus::Loaded { model, .. }) => ui.label(format!("模型: {model}")),
                    Some(ModelStatus::Fallback { model, reason }) => {
                        ui.label(format!("模型: {model} (备用)")).on_hover_text(reason)
                    }
                    None => ui.label("模型: 未连接"),
                };
                ui.separator();
                ui.label(&self.status);
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.tab, Tab::Story, "故事生成");
                ui.selectable_value(&mut self.tab, Tab::Poem, "诗歌生成");
                ui.selectable_value(&mut self.tab, Tab::History, "历史记录");
                ui.selectable_value(&mut self.tab, Tab::Favorites, "我的收藏");
            });
            ui.separator();

            match self.tab {
                Tab::Story => self.story_tab(ui),
                Tab::Poem => self.poem_tab(ui),
                Tab::History => self.history_tab(ui),
                Tab::Favorites => self.favorites_tab(ui),
            }

            if matches!(self.tab, Tab::Story | Tab::Poem)
                && ui
                    .add_sized([200.0, 40.0], egui::Button::new("开始创作"))
                    .clicked()
            {
                self.generate();
            }

            ui.separator();
            self.result_pane(ctx, ui);
        });
    }
}

/// Keyword input with one button per quick keyword.
fn keywords_row(ui: &mut egui::Ui, keywords: &mut String, quick: &[&str]) {
    ui.horizontal(|ui| {
        ui.label("关键词");
        ui.text_edit_singleline(keywords);
    });
    ui.horizontal_wrapped(|ui| {
        for keyword in quick {
            if ui.small_button(*keyword).clicked() {
                *keywords = add_keyword(keywords, keyword);
            }
        }
    });
}

fn labelled_combo<T: Copy + PartialEq>(
    ui: &mut egui::Ui,
    id: &str,
    value: &mut T,
    all: &[T],
    label: fn(&T) -> &'static str,
) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(label(value))
        .show_ui(ui, |ui| {
            for item in all {
                ui.selectable_value(value, *item, label(item));
            }
        });
}

/// Like `labelled_combo` with a leading "不指定" entry.
fn optional_combo<T: Copy + PartialEq>(
    ui: &mut egui::Ui,
    id: &str,
    value: &mut Option<T>,
    all: &[T],
    label: fn(&T) -> &'static str,
) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(value.as_ref().map_or("不指定", label))
        .show_ui(ui, |ui| {
            ui.selectable_value(value, None, "不指定");
            for item in all {
                ui.selectable_value(value, Some(*item), label(item));
            }
        });
}

/// First line of an entry, at most 30 characters.
fn preview(content: &str) -> String {
    let line = content.lines().next().unwrap_or_default();
    let mut preview: String = line.chars().take(30).collect();
    if line.chars().count() > 30 {
        preview.push('…');
    }
    preview
}

/// Registers the first CJK font found on the system as the preferred font.
fn install_cjk_font(ctx: &Context) {
    let Some((path, bytes)) = CJK_FONT_PATHS
        .iter()
        .find_map(|path| std::fs::read(path).ok().map(|bytes| (*path, bytes)))
    else {
        warn!("no CJK font found, Chinese text may not render");
        return;
    };
    info!("using CJK font {path}");

    let mut fonts = egui::FontDefinitions::default();
    fonts
        .font_data
        .insert("cjk".to_owned(), Arc::new(egui::FontData::from_owned(bytes)));
    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
        fonts.families.entry(family).or_default().insert(0, "cjk".to_owned());
    }
    ctx.set_fonts(fonts);
}

/// Application entry point.
fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 640.0])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "AI 故事与诗歌创作",
        options,
        Box::new(|cc| Ok(Box::new(CreatorUI::new(&cc.egui_ctx)?))),
    )
}
