/// Rebuild a file from base64, attach it to the input through a
/// DataTransfer, and fire the change event the app listens for.
pub const SET_FILE_INPUT: &str = r#"
(selector, fileName, mimeType, base64Data) => {
    const input = document.querySelector(selector);
    if (!input) return { success: false, error: 'File input not found' };
    const binary = atob(base64Data);
    const bytes = new Uint8Array(binary.length);
    for (let i = 0; i < binary.length; i++) {
        bytes[i] = binary.charCodeAt(i);
    }
    const blob = new Blob([bytes], { type: mimeType });
    const file = new File([blob], fileName, { type: mimeType });
    const transfer = new DataTransfer();
    transfer.items.add(file);
    input.files = transfer.files;
    input.dispatchEvent(new Event('change', { bubbles: true }));
    return { success: true };
}
"#;
